use std::fmt::Display;
use thiserror::Error;

/// Why an action failed. The display string is the exact message shown to
/// the user in the `{ "error": ... }` reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Unauthorized: You must be logged in.")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    /// The data store or identity provider rejected the call
    #[error("{0}")]
    Provider(String),
}

impl GatewayError {
    pub fn missing_fields() -> Self {
        GatewayError::Validation("Missing required fields".to_string())
    }

    pub fn missing_service_key() -> Self {
        GatewayError::Configuration("Server Configuration Error: Missing Service Role Key".to_string())
    }

    /// Provider failure with the action's label in front of the provider's message
    pub fn provider(label: &str, reason: impl Display) -> Self {
        GatewayError::Provider(format!("{}: {}", label, reason))
    }

    /// Stable name of the error kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated => "unauthenticated",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::Validation(_) => "validation",
            GatewayError::Configuration(_) => "configuration",
            GatewayError::Provider(_) => "provider",
        }
    }
}
