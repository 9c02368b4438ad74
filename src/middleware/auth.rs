use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use std::convert::Infallible;

use crate::auth::SessionToken;
use crate::error::ApiError;
use crate::gateway::MutationGateway;

/// Session credential taken from the `Authorization: Bearer` header.
///
/// Never rejects: a missing or malformed header becomes `None` and the
/// gateway answers it as unauthenticated.
#[derive(Debug, Clone)]
pub struct Credential(pub Option<SessionToken>);

impl Credential {
    pub fn token(&self) -> Option<&SessionToken> {
        self.0.as_ref()
    }

    /// Unwrap a fallible body or path extractor. A rejection is only
    /// reported to callers holding a session; everyone else gets
    /// `Unauthenticated`.
    pub async fn admit<T, R>(&self, gateway: &MutationGateway, extracted: Result<T, R>) -> Result<T, ApiError>
    where
        ApiError: From<R>,
    {
        match extracted {
            Ok(value) => Ok(value),
            Err(rejection) => {
                gateway.authenticate(self.token()).await?;
                Err(ApiError::from(rejection))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_bearer_token(&parts.headers) {
            Ok(token) => Ok(Credential(Some(token))),
            Err(reason) => {
                tracing::debug!("No session credential: {}", reason);
                Ok(Credential(None))
            }
        }
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<SessionToken, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(SessionToken::new(token.trim())),
        Some(_) => Err("Empty bearer token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn reads_bearer_token() {
        let token = extract_bearer_token(&headers("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token.as_str(), "abc.def.ghi");
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer_token(&headers("Bearer   ")).is_err());
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());
    }
}
