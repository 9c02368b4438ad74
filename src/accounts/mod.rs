//! Elevated account management.
//!
//! Creating and removing user identities needs the provider's service-role
//! credential. The gateway only holds an [`AccountAdmin`] when that credential
//! is configured.

pub mod gotrue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use gotrue::GoTrueAccountAdmin;

/// Profile data attached to a new account. The provider copies it into the
/// profile row when the account is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: String,
    pub role: String,
    pub position: String,
    pub phone: String,
}

/// Account as reported back by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AccountError {
    /// The provider rejected the call; the message is the provider's own
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AccountAdmin: Send + Sync {
    /// Create an account through the email invitation flow. The user picks
    /// their password from the invitation link.
    async fn invite_user_by_email(&self, email: &str, metadata: &UserMetadata) -> Result<Account, AccountError>;

    /// Create an account with a known password and a confirmed email
    async fn create_user(&self, email: &str, password: &str, metadata: &UserMetadata) -> Result<Account, AccountError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), AccountError>;
}
