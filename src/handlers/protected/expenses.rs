use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use uuid::Uuid;

use crate::database::models::{ExpensePatch, NewExpense};
use crate::handlers::AppState;
use crate::middleware::{listing, ApiResult, Credential};

/// GET /api/expenses
pub async fn expenses_get(State(gateway): State<AppState>, credential: Credential) -> ApiResult {
    let expenses = gateway.list_expenses(credential.token()).await?;
    listing("expenses", expenses)
}

/// POST /api/expenses
pub async fn expenses_post(
    State(gateway): State<AppState>,
    credential: Credential,
    payload: Result<Json<NewExpense>, JsonRejection>,
) -> ApiResult {
    let Json(form) = credential.admit(&gateway, payload).await?;
    Ok(gateway.create_expense(credential.token(), form).await?)
}

/// PATCH /api/expenses/:id
pub async fn expense_patch(
    State(gateway): State<AppState>,
    credential: Credential,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ExpensePatch>, JsonRejection>,
) -> ApiResult {
    let Path(id) = credential.admit(&gateway, id).await?;
    let Json(patch) = credential.admit(&gateway, payload).await?;
    Ok(gateway.update_expense(credential.token(), id, patch).await?)
}

/// DELETE /api/expenses/:id
pub async fn expense_delete(
    State(gateway): State<AppState>,
    credential: Credential,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    let Path(id) = credential.admit(&gateway, id).await?;
    Ok(gateway.delete_expense(credential.token(), id).await?)
}
