use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::database::models::NewEvent;
use crate::handlers::AppState;
use crate::middleware::{listing, ApiResult, Credential};

/// GET /api/events - calendar, earliest first
pub async fn events_get(State(gateway): State<AppState>, credential: Credential) -> ApiResult {
    let events = gateway.list_events(credential.token()).await?;
    listing("events", events)
}

/// POST /api/events
pub async fn events_post(
    State(gateway): State<AppState>,
    credential: Credential,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> ApiResult {
    let Json(form) = credential.admit(&gateway, payload).await?;
    Ok(gateway.create_event(credential.token(), form).await?)
}
