// handlers/mod.rs - HTTP surface over the mutation gateway
//
// Public: service info and health, no credential needed.
// Protected (/api/*): every handler passes the bearer credential, if any,
// straight to the gateway, which decides between 401, 403 and success.

pub mod protected;
pub mod public;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::gateway::MutationGateway;

/// Shared handler state
pub type AppState = Arc<MutationGateway>;

/// Full route table without global layers
pub fn router(gateway: AppState) -> Router {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(protected::routes())
        .with_state(gateway)
}
