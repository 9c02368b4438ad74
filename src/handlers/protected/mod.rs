// handlers/protected/mod.rs - /api/* routes
//
// No authentication middleware sits in front of these routes. The
// credential extractor never rejects, and the gateway's guard runs first
// inside every action.

pub mod employees;
pub mod events;
pub mod expenses;
pub mod leads;
pub mod views;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(employees::employees_get).post(employees::employees_post))
        .route("/api/employees/invite", post(employees::employees_invite_post))
        .route("/api/employees/:id", delete(employees::employee_delete))
        .route("/api/expenses", get(expenses::expenses_get).post(expenses::expenses_post))
        .route("/api/expenses/:id", patch(expenses::expense_patch).delete(expenses::expense_delete))
        .route("/api/leads", get(leads::leads_get).post(leads::leads_post))
        .route("/api/leads/import", post(leads::leads_import_post))
        .route("/api/leads/:id", patch(leads::lead_patch).delete(leads::lead_delete))
        .route("/api/events", get(events::events_get).post(events::events_post))
        .route("/api/views/stream", get(views::views_stream))
}
