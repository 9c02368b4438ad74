use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::ApiError;
use crate::gateway::ActionOutcome;

/// Handler result: success envelope or `{ "error" }` with a status code
pub type ApiResult = Result<ActionOutcome, ApiError>;

impl IntoResponse for ActionOutcome {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Wrap a listing in the success envelope
pub fn listing<T: Serialize>(noun: &str, items: Vec<T>) -> ApiResult {
    let count = items.len();
    let data = serde_json::to_value(items).map_err(|e| {
        tracing::error!("Failed to serialize {}: {}", noun, e);
        ApiError::InternalServerError("Failed to serialize response data".to_string())
    })?;
    Ok(ActionOutcome::ok(format!("Loaded {} {}", count, noun)).with_data(data))
}
