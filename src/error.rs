// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, StringRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::gateway::GatewayError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (store or auth provider rejected the call)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-facing error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::InvalidJson(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Failure half of the action result contract
    pub fn to_json(&self) -> Value {
        json!({ "error": self.message() })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::Unauthenticated => {
                tracing::debug!("Request rejected: {}", message);
                ApiError::Unauthorized(message)
            }
            GatewayError::Forbidden(_) => {
                tracing::warn!("Request rejected ({}): {}", err.kind(), message);
                ApiError::Forbidden(message)
            }
            GatewayError::Validation(_) => {
                tracing::warn!("Request rejected ({}): {}", err.kind(), message);
                ApiError::BadRequest(message)
            }
            GatewayError::Configuration(_) => {
                tracing::error!("Configuration error: {}", message);
                ApiError::InternalServerError(message)
            }
            GatewayError::Provider(_) => {
                tracing::error!("Provider error: {}", message);
                ApiError::BadGateway(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Invalid JSON body: {}", rejection.body_text());
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<StringRejection> for ApiError {
    fn from(rejection: StringRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_to_status_codes() {
        let cases = [
            (GatewayError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (GatewayError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (GatewayError::missing_fields(), StatusCode::BAD_REQUEST),
            (GatewayError::missing_service_key(), StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::provider("Failed to delete lead", "gone"), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn body_is_error_only() {
        let err = ApiError::from(GatewayError::missing_service_key());
        assert_eq!(
            err.to_json(),
            json!({ "error": "Server Configuration Error: Missing Service Role Key" })
        );
    }
}
