pub mod accounts;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod refresh;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;
