use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{decode_rows, required, ActionOutcome, ActionResult, GatewayError, MutationGateway, Requirement};
use crate::auth::SessionToken;
use crate::database::models::{Expense, ExpensePatch, ExpenseStatus, NewExpense};
use crate::database::{fields_of, OrderBy, RecordKind};
use crate::refresh::View;

/// Column set written for a new expense
#[derive(Serialize)]
struct ExpenseInsert<'a> {
    description: &'a str,
    amount: Decimal,
    date: NaiveDate,
    status: ExpenseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_url: Option<&'a str>,
    submitted_by: Uuid,
}

impl MutationGateway {
    pub async fn list_expenses(&self, credential: Option<&SessionToken>) -> Result<Vec<Expense>, GatewayError> {
        self.authorize(credential, Requirement::Authenticated).await?;
        let rows = self
            .records
            .select(RecordKind::Expenses, OrderBy::newest_first())
            .await
            .map_err(|e| GatewayError::provider("Failed to load expenses", e))?;
        decode_rows(rows, "Failed to load expenses")
    }

    /// Submit an expense on behalf of the caller. New expenses start as `Pending`.
    pub async fn create_expense(&self, credential: Option<&SessionToken>, form: NewExpense) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;

        let (description, amount) = match (required(&form.description), form.amount) {
            (Some(description), Some(amount)) => (description, amount),
            _ => return Err(GatewayError::missing_fields()),
        };
        if amount < Decimal::ZERO {
            return Err(GatewayError::Validation("Amount must not be negative".to_string()));
        }

        let insert = ExpenseInsert {
            description,
            amount,
            date: form.date.unwrap_or_else(|| Utc::now().date_naive()),
            status: ExpenseStatus::Pending,
            receipt_url: required(&form.receipt_url),
            submitted_by: actor.id,
        };
        let fields = fields_of(&insert).map_err(|e| GatewayError::provider("Failed to create expense", e))?;

        match self.records.insert(RecordKind::Expenses, fields).await {
            Ok(row) => {
                tracing::info!("Expense of {} submitted by {}", amount, actor.id);
                self.mark_stale(View::Expenses);
                Ok(ActionOutcome::ok("Expense created successfully").with_data(row))
            }
            Err(e) => {
                tracing::error!("Creating expense for {} failed: {}", actor.id, e);
                Err(GatewayError::provider("Failed to create expense", e))
            }
        }
    }

    /// Apply a partial update. No ownership check: any signed-in caller may
    /// edit any expense, and the last write wins.
    pub async fn update_expense(&self, credential: Option<&SessionToken>, id: Uuid, patch: ExpensePatch) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;
        let fields = fields_of(&patch).map_err(|e| GatewayError::provider("Failed to update expense", e))?;

        match self.records.update(RecordKind::Expenses, id, fields).await {
            Ok(()) => {
                tracing::info!("Expense {} updated by {}", id, actor.id);
                self.mark_stale(View::Expenses);
                Ok(ActionOutcome::ok("Expense updated successfully"))
            }
            Err(e) => {
                tracing::error!("Updating expense {} failed: {}", id, e);
                Err(GatewayError::provider("Failed to update expense", e))
            }
        }
    }

    pub async fn delete_expense(&self, credential: Option<&SessionToken>, id: Uuid) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;

        match self.records.delete(RecordKind::Expenses, id).await {
            Ok(()) => {
                tracing::info!("Expense {} deleted by {}", id, actor.id);
                self.mark_stale(View::Expenses);
                Ok(ActionOutcome::ok("Expense deleted successfully"))
            }
            Err(e) => {
                tracing::error!("Deleting expense {} failed: {}", id, e);
                Err(GatewayError::provider("Failed to delete expense", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use crate::types::Role;
    use serde_json::json;

    #[tokio::test]
    async fn delete_without_session_touches_nothing() {
        let harness = TestHarness::new();

        let err = harness.gateway().delete_expense(None, Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err, GatewayError::Unauthenticated);
        assert_eq!(harness.records.calls(), 0);
        assert_eq!(harness.roles.lookups(), 0);
        assert!(harness.refresh.signals().is_empty());
    }

    #[tokio::test]
    async fn delete_success_marks_expenses_stale_once() {
        let harness = TestHarness::new();
        let (token, actor) = harness.sign_in(Role::User);
        let id = harness.seed(RecordKind::Expenses, json!({ "description": "Taxi", "submitted_by": actor }));

        let outcome = harness.gateway().delete_expense(Some(&token), id).await.unwrap();

        assert_eq!(outcome.message, "Expense deleted successfully");
        assert_eq!(harness.records.calls(), 1);
        assert!(harness.records.row(RecordKind::Expenses, id).is_none());
        assert_eq!(harness.refresh.signals(), vec![View::Expenses]);
    }

    #[tokio::test]
    async fn delete_failure_reports_store_message_without_signal() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::User);
        harness.records.fail_with("permission denied for table expenses");

        let err = harness.gateway().delete_expense(Some(&token), Uuid::new_v4()).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to delete expense: permission denied for table expenses"
        );
        assert!(harness.refresh.signals().is_empty());
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let harness = TestHarness::new();
        let (token, actor) = harness.sign_in(Role::User);
        let id = harness.seed(
            RecordKind::Expenses,
            json!({ "description": "Taxi", "amount": "23.50", "status": "Pending", "submitted_by": actor }),
        );

        let patch = ExpensePatch { status: Some(ExpenseStatus::Approved), ..Default::default() };
        let outcome = harness.gateway().update_expense(Some(&token), id, patch).await.unwrap();

        assert_eq!(outcome.message, "Expense updated successfully");
        let row = harness.records.row(RecordKind::Expenses, id).unwrap();
        assert_eq!(row["status"], "Approved");
        assert_eq!(row["description"], "Taxi");
        assert_eq!(row["amount"], "23.50");
    }

    #[tokio::test]
    async fn create_defaults_status_and_submitter() {
        let harness = TestHarness::new();
        let (token, actor) = harness.sign_in(Role::User);
        let form = NewExpense {
            description: Some("Client lunch".to_string()),
            amount: Some(Decimal::new(4250, 2)),
            date: NaiveDate::from_ymd_opt(2024, 5, 2),
            receipt_url: None,
        };

        let outcome = harness.gateway().create_expense(Some(&token), form).await.unwrap();

        assert_eq!(outcome.message, "Expense created successfully");
        let data = outcome.data.unwrap();
        assert_eq!(data["status"], "Pending");
        assert_eq!(data["submitted_by"], json!(actor));
        assert_eq!(data["date"], "2024-05-02");
        assert!(data.get("receipt_url").is_none());
        assert_eq!(harness.refresh.signals(), vec![View::Expenses]);
    }

    #[tokio::test]
    async fn create_validates_before_store_call() {
        let harness = TestHarness::new();
        let (token, _) = harness.sign_in(Role::User);

        let err = harness
            .gateway()
            .create_expense(Some(&token), NewExpense { description: Some("Fuel".to_string()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::missing_fields());

        let negative = NewExpense {
            description: Some("Refund".to_string()),
            amount: Some(Decimal::new(-5, 0)),
            ..Default::default()
        };
        let err = harness.gateway().create_expense(Some(&token), negative).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(harness.records.calls(), 0);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let harness = TestHarness::new();
        let (token, actor) = harness.sign_in(Role::User);
        for description in ["First", "Second"] {
            let form = NewExpense {
                description: Some(description.to_string()),
                amount: Some(Decimal::ONE),
                ..Default::default()
            };
            harness.gateway().create_expense(Some(&token), form).await.unwrap();
        }

        let expenses = harness.gateway().list_expenses(Some(&token)).await.unwrap();

        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[0].description, "Second");
        assert_eq!(expenses[1].submitted_by, actor);
    }
}
