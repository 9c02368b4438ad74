#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crm_gateway::auth::SessionToken;
use crm_gateway::handlers;
use crm_gateway::testing::TestHarness;

/// Router wired to in-memory collaborators
pub struct TestApp {
    pub harness: TestHarness,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::from_harness(TestHarness::new())
    }

    pub fn without_accounts() -> Self {
        Self::from_harness(TestHarness::without_accounts())
    }

    fn from_harness(harness: TestHarness) -> Self {
        let router = handlers::router(Arc::new(harness.gateway()));
        Self { harness, router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a JSON request and read the JSON reply
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&SessionToken>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let (content_type, body) = match body {
            Some(json) => ("application/json", Body::from(serde_json::to_vec(&json)?)),
            None => ("application/json", Body::empty()),
        };
        self.send_raw(method, uri, token, content_type, body).await
    }

    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&SessionToken>,
        content_type: &str,
        body: Body,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token.as_str()));
        }

        let response = self.router().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }
}
