use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Row of the `expenses` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
    #[serde(default)]
    pub receipt_url: Option<String>,
    pub submitted_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Expense submission form. Every field is optional at the wire level so a
/// missing value becomes a validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewExpense {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub receipt_url: Option<String>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExpenseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
}
