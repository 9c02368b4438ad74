//! Authorized mutation gateway.
//!
//! Every action follows the same steps: resolve the caller's session, check
//! the role when the action needs one, make one call to the store or
//! the account provider, then mark the affected view stale. Collaborators are
//! injected as trait objects so the gateway holds no per-request state and
//! never reaches for an ambient client.

pub mod employees;
pub mod error;
pub mod events;
pub mod expenses;
pub mod leads;
pub mod outcome;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::accounts::AccountAdmin;
use crate::auth::{SessionResolver, SessionToken};
use crate::database::{RecordStore, RoleStore};
use crate::refresh::{RefreshSignal, View};
use crate::types::Role;

pub use employees::ProvisionMode;
pub use error::GatewayError;
pub use outcome::{ActionOutcome, ActionResult};

/// What an action demands of its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any valid session
    Authenticated,
    /// A valid session whose profile currently holds `role`.
    /// `action` completes the refusal message, e.g. "invite users".
    Role { role: Role, action: &'static str },
}

impl Requirement {
    pub fn admin(action: &'static str) -> Self {
        Requirement::Role { role: Role::Admin, action }
    }
}

/// The caller of one action. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    /// Role read from the role store during this call. `None` when the
    /// requirement did not need a lookup.
    pub role: Option<Role>,
}

pub struct MutationGateway {
    sessions: Arc<dyn SessionResolver>,
    roles: Arc<dyn RoleStore>,
    records: Arc<dyn RecordStore>,
    refresh: Arc<dyn RefreshSignal>,
    accounts: Option<Arc<dyn AccountAdmin>>,
}

impl MutationGateway {
    pub fn new(
        sessions: Arc<dyn SessionResolver>,
        roles: Arc<dyn RoleStore>,
        records: Arc<dyn RecordStore>,
        refresh: Arc<dyn RefreshSignal>,
    ) -> Self {
        Self {
            sessions,
            roles,
            records,
            refresh,
            accounts: None,
        }
    }

    /// Attach the elevated account-management capability
    pub fn with_accounts(mut self, accounts: Arc<dyn AccountAdmin>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Authorization guard shared by every action
    pub async fn authorize(&self, credential: Option<&SessionToken>, requirement: Requirement) -> Result<Actor, GatewayError> {
        let actor = self.authenticate(credential).await?;
        match requirement {
            Requirement::Authenticated => Ok(actor),
            Requirement::Role { role, action } => self.require_role(actor, role, action).await,
        }
    }

    /// Session check alone, with no role lookup
    pub async fn authenticate(&self, credential: Option<&SessionToken>) -> Result<Actor, GatewayError> {
        let token = credential.ok_or(GatewayError::Unauthenticated)?;
        let identity = self.sessions.resolve(token).await.ok_or_else(|| {
            tracing::debug!("Rejected request without a valid session");
            GatewayError::Unauthenticated
        })?;
        Ok(Actor {
            id: identity.id,
            role: None,
        })
    }

    /// Reads the actor's role fresh from the role store on every call
    async fn require_role(&self, actor: Actor, required: Role, action: &'static str) -> Result<Actor, GatewayError> {
        let refusal = || {
            GatewayError::Forbidden(format!(
                "Unauthorized: Only {}s can {}.",
                required.as_str().to_lowercase(),
                action
            ))
        };

        let current = match self.roles.role_of(actor.id).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!("Role lookup for {} failed: {}", actor.id, e);
                return Err(refusal());
            }
        };

        match current {
            Some(role) if role == required => Ok(Actor {
                role: Some(role),
                ..actor
            }),
            other => {
                tracing::warn!(
                    "Actor {} with role {:?} refused: {} requires {}",
                    actor.id,
                    other,
                    action,
                    required
                );
                Err(refusal())
            }
        }
    }

    /// Guard for account-management actions. The elevated credential is
    /// checked after the session and before the role, so a missing key is
    /// reported to every signed-in caller alike.
    async fn authorize_account_admin(
        &self,
        credential: Option<&SessionToken>,
        action: &'static str,
    ) -> Result<(Actor, &dyn AccountAdmin), GatewayError> {
        let actor = self.authenticate(credential).await?;
        let accounts = self.accounts()?;
        let actor = self.require_role(actor, Role::Admin, action).await?;
        Ok((actor, accounts))
    }

    /// Subscribe to stale-view notifications on behalf of an authenticated caller
    pub async fn subscribe_views(&self, credential: Option<&SessionToken>) -> Result<broadcast::Receiver<View>, GatewayError> {
        self.authorize(credential, Requirement::Authenticated).await?;
        self.refresh
            .subscribe()
            .ok_or_else(|| GatewayError::Configuration("Live view updates are not available".to_string()))
    }

    /// Store connectivity check for the health endpoint
    pub async fn ping(&self) -> Result<(), GatewayError> {
        self.records
            .ping()
            .await
            .map_err(|e| GatewayError::provider("Database unavailable", e))
    }

    fn mark_stale(&self, view: View) {
        self.refresh.mark_stale(view);
    }

    fn accounts(&self) -> Result<&dyn AccountAdmin, GatewayError> {
        self.accounts.as_deref().ok_or_else(|| {
            tracing::error!("Account management requested but no service role key is configured");
            GatewayError::missing_service_key()
        })
    }
}

/// Trimmed value of a required form field, `None` when absent or blank
pub(crate) fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, label: &str) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| GatewayError::provider(label, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    #[tokio::test]
    async fn missing_credential_is_unauthenticated() {
        let harness = TestHarness::new();
        let err = harness.gateway().authorize(None, Requirement::Authenticated).await.unwrap_err();
        assert_eq!(err, GatewayError::Unauthenticated);
        assert_eq!(harness.roles.lookups(), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_unauthenticated() {
        let harness = TestHarness::new();
        let token = SessionToken::new("forged");
        let err = harness
            .gateway()
            .authorize(Some(&token), Requirement::admin("invite users"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Unauthenticated);
        assert_eq!(harness.roles.lookups(), 0);
    }

    #[tokio::test]
    async fn authenticated_requirement_skips_role_lookup() {
        let harness = TestHarness::new();
        let (token, id) = harness.sign_in(Role::User);
        let actor = harness.gateway().authorize(Some(&token), Requirement::Authenticated).await.unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, None);
        assert_eq!(harness.roles.lookups(), 0);
    }

    #[tokio::test]
    async fn admin_requirement_checks_role_each_call() {
        let harness = TestHarness::new();
        let (token, id) = harness.sign_in(Role::Admin);
        let gateway = harness.gateway();

        let actor = gateway.authorize(Some(&token), Requirement::admin("delete users")).await.unwrap();
        assert_eq!(actor.role, Some(Role::Admin));

        // Demoted between calls on the same session
        harness.roles.set_role(id, Role::User);
        let err = gateway.authorize(Some(&token), Requirement::admin("delete users")).await.unwrap_err();
        assert_eq!(err, GatewayError::Forbidden("Unauthorized: Only admins can delete users.".to_string()));
        assert_eq!(harness.roles.lookups(), 2);
    }

    #[tokio::test]
    async fn missing_profile_or_failed_lookup_is_forbidden() {
        let harness = TestHarness::new();
        let (token, id) = harness.sign_in(Role::Admin);
        harness.roles.remove(id);
        let err = harness
            .gateway()
            .authorize(Some(&token), Requirement::admin("invite users"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));

        harness.roles.set_role(id, Role::Admin);
        harness.roles.fail_with("connection refused");
        let err = harness
            .gateway()
            .authorize(Some(&token), Requirement::admin("invite users"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(&Some("  ann@example.com ".to_string())), Some("ann@example.com"));
        assert_eq!(required(&Some("   ".to_string())), None);
        assert_eq!(required(&None), None);
    }
}
