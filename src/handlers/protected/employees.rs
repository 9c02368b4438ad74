use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use uuid::Uuid;

use crate::database::models::EmployeeForm;
use crate::handlers::AppState;
use crate::middleware::{listing, ApiResult, Credential};

/// GET /api/employees
pub async fn employees_get(State(gateway): State<AppState>, credential: Credential) -> ApiResult {
    let employees = gateway.list_employees(credential.token()).await?;
    listing("employees", employees)
}

/// POST /api/employees - create with a known password
pub async fn employees_post(
    State(gateway): State<AppState>,
    credential: Credential,
    payload: Result<Json<EmployeeForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = credential.admit(&gateway, payload).await?;
    Ok(gateway.create_employee(credential.token(), form).await?)
}

/// POST /api/employees/invite - create through an email invitation
pub async fn employees_invite_post(
    State(gateway): State<AppState>,
    credential: Credential,
    payload: Result<Json<EmployeeForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = credential.admit(&gateway, payload).await?;
    Ok(gateway.invite_employee(credential.token(), form).await?)
}

/// DELETE /api/employees/:id
pub async fn employee_delete(
    State(gateway): State<AppState>,
    credential: Credential,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    let Path(id) = credential.admit(&gateway, id).await?;
    Ok(gateway.delete_employee(credential.token(), id).await?)
}
