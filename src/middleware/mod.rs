pub mod auth;
pub mod response;

pub use auth::Credential;
pub use response::{listing, ApiResult};
