use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, StringRejection},
        Path, State,
    },
    Json,
};
use uuid::Uuid;

use crate::database::models::{LeadPatch, NewLead};
use crate::handlers::AppState;
use crate::middleware::{listing, ApiResult, Credential};

/// GET /api/leads
pub async fn leads_get(State(gateway): State<AppState>, credential: Credential) -> ApiResult {
    let leads = gateway.list_leads(credential.token()).await?;
    listing("leads", leads)
}

/// POST /api/leads
pub async fn leads_post(
    State(gateway): State<AppState>,
    credential: Credential,
    payload: Result<Json<NewLead>, JsonRejection>,
) -> ApiResult {
    let Json(form) = credential.admit(&gateway, payload).await?;
    Ok(gateway.create_lead(credential.token(), form).await?)
}

/// POST /api/leads/import - CSV document as the raw body
pub async fn leads_import_post(
    State(gateway): State<AppState>,
    credential: Credential,
    body: Result<String, StringRejection>,
) -> ApiResult {
    let document = credential.admit(&gateway, body).await?;
    Ok(gateway.import_leads_csv(credential.token(), &document).await?)
}

/// PATCH /api/leads/:id
pub async fn lead_patch(
    State(gateway): State<AppState>,
    credential: Credential,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<LeadPatch>, JsonRejection>,
) -> ApiResult {
    let Path(id) = credential.admit(&gateway, id).await?;
    let Json(patch) = credential.admit(&gateway, payload).await?;
    Ok(gateway.update_lead(credential.token(), id, patch).await?)
}

/// DELETE /api/leads/:id
pub async fn lead_delete(
    State(gateway): State<AppState>,
    credential: Credential,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    let Path(id) = credential.admit(&gateway, id).await?;
    Ok(gateway.delete_lead(credential.token(), id).await?)
}
