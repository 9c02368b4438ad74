use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::null_as_default;
use crate::types::Role;

/// Row of the `profiles` table. One per account, keyed by the account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Employee provisioning form, shared by the invite and direct-create flows.
/// `password` is only read by direct create.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeForm {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}
