use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;

/// GET / - service info
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "employees": "/api/employees",
            "expenses": "/api/expenses",
            "leads": "/api/leads",
            "events": "/api/events",
            "views": "/api/views/stream"
        }
    }))
}

/// GET /health - record store connectivity
pub async fn health(State(gateway): State<AppState>) -> Result<Json<Value>, ApiError> {
    match gateway.ping().await {
        Ok(()) => Ok(Json(json!({ "status": "ok", "database": "connected" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::service_unavailable(e.to_string()))
        }
    }
}
