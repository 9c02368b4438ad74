use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::{Account, AccountAdmin, AccountError, UserMetadata};

/// Admin client for a GoTrue-compatible auth server (`/auth/v1`)
pub struct GoTrueAccountAdmin {
    client: Client,
    base_url: Url,
    service_role_key: String,
}

impl GoTrueAccountAdmin {
    pub fn new(base_url: &str, service_role_key: impl Into<String>, timeout: Duration) -> Result<Self, AccountError> {
        let mut base_url = Url::parse(base_url).map_err(|e| AccountError::Transport(format!("invalid auth provider URL: {}", e)))?;
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AccountError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            service_role_key: service_role_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AccountError> {
        self.base_url
            .join(path)
            .map_err(|e| AccountError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AccountError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AccountError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AccountError::Rejected(provider_message(status.as_u16(), &body)))
    }

    async fn read_account(response: Response) -> Result<Account, AccountError> {
        response
            .json::<Account>()
            .await
            .map_err(|e| AccountError::Decode(e.to_string()))
    }
}

/// Pull the human-readable message out of a provider error body
fn provider_message(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    });

    match message {
        Some(msg) => msg,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("auth provider returned status {}", status),
    }
}

#[async_trait]
impl AccountAdmin for GoTrueAccountAdmin {
    async fn invite_user_by_email(&self, email: &str, metadata: &UserMetadata) -> Result<Account, AccountError> {
        let url = self.endpoint("auth/v1/invite")?;
        let body = json!({ "email": email, "data": metadata });

        tracing::debug!("Inviting {} via {}", email, url);
        let response = self.send(self.request(Method::POST, url).json(&body)).await?;
        Self::read_account(response).await
    }

    async fn create_user(&self, email: &str, password: &str, metadata: &UserMetadata) -> Result<Account, AccountError> {
        let url = self.endpoint("auth/v1/admin/users")?;
        let body = json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": metadata,
        });

        tracing::debug!("Creating confirmed account for {}", email);
        let response = self.send(self.request(Method::POST, url).json(&body)).await?;
        Self::read_account(response).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AccountError> {
        let url = self.endpoint(&format!("auth/v1/admin/users/{}", id))?;

        tracing::debug!("Deleting account {}", id);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
