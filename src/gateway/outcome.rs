use serde::Serialize;
use serde_json::Value;

use super::error::GatewayError;

/// Successful action. Serializes as `{ "success": true, "message": ... }`,
/// plus `data` when the action produced a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub type ActionResult = Result<ActionOutcome, GatewayError>;
