use uuid::Uuid;

use super::{decode_rows, required, ActionOutcome, ActionResult, GatewayError, MutationGateway, Requirement};
use crate::accounts::UserMetadata;
use crate::auth::SessionToken;
use crate::database::models::{Employee, EmployeeForm};
use crate::database::{OrderBy, RecordKind};
use crate::refresh::View;
use crate::types::Role;

/// How a new employee account comes into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionMode {
    /// Email invitation; the employee sets their own password
    Invite,
    /// Caller-supplied password, email marked confirmed immediately
    DirectCreate,
}

impl ProvisionMode {
    fn action(&self) -> &'static str {
        match self {
            ProvisionMode::Invite => "invite users",
            ProvisionMode::DirectCreate => "create users",
        }
    }

    fn failure_label(&self) -> &'static str {
        match self {
            ProvisionMode::Invite => "Failed to invite user",
            ProvisionMode::DirectCreate => "Failed to create user",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            ProvisionMode::Invite => {
                "Invitation sent successfully. The user will receive an email to set their password."
            }
            ProvisionMode::DirectCreate => "User created successfully.",
        }
    }
}

impl MutationGateway {
    pub async fn invite_employee(&self, credential: Option<&SessionToken>, form: EmployeeForm) -> ActionResult {
        self.provision_employee(credential, ProvisionMode::Invite, form).await
    }

    pub async fn create_employee(&self, credential: Option<&SessionToken>, form: EmployeeForm) -> ActionResult {
        self.provision_employee(credential, ProvisionMode::DirectCreate, form).await
    }

    /// Admin-only account creation. Not idempotent: provisioning the same
    /// email twice surfaces the provider's error on the second call.
    pub async fn provision_employee(
        &self,
        credential: Option<&SessionToken>,
        mode: ProvisionMode,
        form: EmployeeForm,
    ) -> ActionResult {
        let (actor, accounts) = self.authorize_account_admin(credential, mode.action()).await?;

        let (email, name, role) = match (required(&form.email), required(&form.name), required(&form.role)) {
            (Some(email), Some(name), Some(role)) => (email, name, role),
            _ => return Err(GatewayError::missing_fields()),
        };
        let password = match mode {
            ProvisionMode::Invite => None,
            ProvisionMode::DirectCreate => Some(required(&form.password).ok_or_else(GatewayError::missing_fields)?),
        };
        let role: Role = role.parse().map_err(GatewayError::Validation)?;

        let metadata = UserMetadata {
            full_name: name.to_string(),
            role: role.to_string(),
            position: form.position.unwrap_or_default(),
            phone: form.phone.unwrap_or_default(),
        };

        let created = match password {
            None => accounts.invite_user_by_email(email, &metadata).await,
            Some(password) => accounts.create_user(email, password, &metadata).await,
        };

        match created {
            Ok(account) => {
                tracing::info!("{:?}: account {} for {} as {} by {}", mode, account.id, email, role, actor.id);
                self.mark_stale(View::Employees);
                Ok(ActionOutcome::ok(mode.success_message()))
            }
            Err(e) => {
                tracing::error!("{:?} for {} failed: {}", mode, email, e);
                Err(GatewayError::provider(mode.failure_label(), e))
            }
        }
    }

    /// Admin-only account removal. The profile row goes with the account
    /// through the store's foreign-key cascade.
    pub async fn delete_employee(&self, credential: Option<&SessionToken>, employee_id: Uuid) -> ActionResult {
        let (actor, accounts) = self.authorize_account_admin(credential, "delete users").await?;

        match accounts.delete_user(employee_id).await {
            Ok(()) => {
                tracing::info!("Deleted account {} by {}", employee_id, actor.id);
                self.mark_stale(View::Employees);
                Ok(ActionOutcome::ok("User deleted successfully"))
            }
            Err(e) => {
                tracing::error!("Deleting account {} failed: {}", employee_id, e);
                Err(GatewayError::provider("Failed to delete user", e))
            }
        }
    }

    pub async fn list_employees(&self, credential: Option<&SessionToken>) -> Result<Vec<Employee>, GatewayError> {
        self.authorize(credential, Requirement::Authenticated).await?;
        let rows = self
            .records
            .select(RecordKind::Profiles, OrderBy::newest_first())
            .await
            .map_err(|e| GatewayError::provider("Failed to load employees", e))?;
        decode_rows(rows, "Failed to load employees")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AccountCall, TestHarness};

    fn valid_form() -> EmployeeForm {
        EmployeeForm {
            email: Some("new.hire@example.com".to_string()),
            name: Some("New Hire".to_string()),
            role: Some("User".to_string()),
            position: Some("Sales".to_string()),
            phone: Some("555-0100".to_string()),
            password: None,
        }
    }

    #[tokio::test]
    async fn user_role_cannot_invite() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::User);

        let err = harness.gateway().invite_employee(Some(&token), valid_form()).await.unwrap_err();

        assert_eq!(err.to_string(), "Unauthorized: Only admins can invite users.");
        assert!(harness.accounts.calls().is_empty());
        assert!(harness.refresh.signals().is_empty());
    }

    #[tokio::test]
    async fn admin_invite_sends_metadata_and_refreshes_employees() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::Admin);

        let outcome = harness.gateway().invite_employee(Some(&token), valid_form()).await.unwrap();

        assert_eq!(
            outcome.message,
            "Invitation sent successfully. The user will receive an email to set their password."
        );
        assert_eq!(
            harness.accounts.calls(),
            vec![AccountCall::Invite {
                email: "new.hire@example.com".to_string(),
                metadata: UserMetadata {
                    full_name: "New Hire".to_string(),
                    role: "User".to_string(),
                    position: "Sales".to_string(),
                    phone: "555-0100".to_string(),
                },
            }]
        );
        assert_eq!(harness.refresh.signals(), vec![View::Employees]);
    }

    #[tokio::test]
    async fn missing_fields_fail_before_provider_call() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::Admin);

        for form in [
            EmployeeForm { email: None, ..valid_form() },
            EmployeeForm { name: Some("  ".to_string()), ..valid_form() },
            EmployeeForm { role: None, ..valid_form() },
        ] {
            let err = harness.gateway().invite_employee(Some(&token), form).await.unwrap_err();
            assert_eq!(err, GatewayError::missing_fields());
        }
        assert!(harness.accounts.calls().is_empty());
    }

    #[tokio::test]
    async fn direct_create_requires_password() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::Admin);

        let err = harness.gateway().create_employee(Some(&token), valid_form()).await.unwrap_err();
        assert_eq!(err, GatewayError::missing_fields());

        let form = EmployeeForm { password: Some("s3cret-pass".to_string()), ..valid_form() };
        let outcome = harness.gateway().create_employee(Some(&token), form).await.unwrap();
        assert_eq!(outcome.message, "User created successfully.");
        assert!(matches!(
            harness.accounts.calls().as_slice(),
            [AccountCall::Create { password, .. }] if password == "s3cret-pass"
        ));
    }

    #[tokio::test]
    async fn unknown_role_is_a_validation_error() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::Admin);
        let form = EmployeeForm { role: Some("Owner".to_string()), ..valid_form() };

        let err = harness.gateway().invite_employee(Some(&token), form).await.unwrap_err();
        assert_eq!(err, GatewayError::Validation("Invalid role: Owner".to_string()));
    }

    #[tokio::test]
    async fn missing_service_key_is_a_configuration_error() {
        let harness = TestHarness::without_accounts();
        let (token, _) = harness.sign_in(Role::Admin);

        let err = harness.gateway().invite_employee(Some(&token), valid_form()).await.unwrap_err();
        assert_eq!(err, GatewayError::missing_service_key());

        let err = harness.gateway().delete_employee(Some(&token), Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err, GatewayError::missing_service_key());
    }

    #[tokio::test]
    async fn missing_service_key_is_reported_to_users_too() {
        let harness = TestHarness::without_accounts();
        let (token, _) = harness.sign_in(Role::User);

        let err = harness.gateway().invite_employee(Some(&token), valid_form()).await.unwrap_err();
        assert_eq!(err, GatewayError::missing_service_key());
        assert_eq!(harness.roles.lookups(), 0);

        let err = harness.gateway().invite_employee(None, valid_form()).await.unwrap_err();
        assert_eq!(err, GatewayError::Unauthenticated);
    }

    #[tokio::test]
    async fn provider_error_is_passed_through_with_label() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::Admin);
        harness.accounts.fail_with("A user with this email address has already been registered");

        let err = harness.gateway().invite_employee(Some(&token), valid_form()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to invite user: A user with this email address has already been registered"
        );
        assert!(harness.refresh.signals().is_empty());
    }

    #[tokio::test]
    async fn delete_employee_is_admin_only() {
        let harness = TestHarness::new();
        let target = Uuid::new_v4();

        let (user_token, _) = harness.sign_in(Role::User);
        let err = harness.gateway().delete_employee(Some(&user_token), target).await.unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized: Only admins can delete users.");
        assert!(harness.accounts.calls().is_empty());

        let (admin_token, _) = harness.sign_in(Role::Admin);
        let outcome = harness.gateway().delete_employee(Some(&admin_token), target).await.unwrap();
        assert_eq!(outcome.message, "User deleted successfully");
        assert_eq!(harness.accounts.calls(), vec![AccountCall::Delete { id: target }]);
        assert_eq!(harness.refresh.signals(), vec![View::Employees]);
    }

    #[tokio::test]
    async fn delete_employee_failure_message() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::Admin);
        harness.accounts.fail_with("User not found");

        let err = harness.gateway().delete_employee(Some(&token), Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete user: User not found");
        assert!(harness.refresh.signals().is_empty());
    }

    #[tokio::test]
    async fn lists_profiles() {
        let harness = TestHarness::new();
        let (token, id) = harness.sign_in(Role::User);
        harness.seed_profile(id, "Ann Example", Role::User);

        let employees = harness.gateway().list_employees(Some(&token)).await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].full_name, "Ann Example");
    }
}
