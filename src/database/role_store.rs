use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::record_store::StoreError;
use crate::types::Role;

/// System of record for actor roles
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Role on the actor's profile row, or `None` when there is no row
    async fn role_of(&self, actor_id: Uuid) -> Result<Option<Role>, StoreError>;
}

/// Reads `profiles.role` on every call. Nothing is cached.
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn role_of(&self, actor_id: Uuid) -> Result<Option<Role>, StoreError> {
        let role: Option<Option<String>> = sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
            .bind(actor_id)
            .fetch_optional(&self.pool)
            .await?;

        // A row whose role is null or not a known role grants nothing
        Ok(role.flatten().and_then(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!("Profile {} has unrecognised role: {}", actor_id, e);
                None
            }
        }))
    }
}
