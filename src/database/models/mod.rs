pub mod event;
pub mod expense;
pub mod lead;
pub mod profile;

pub use event::{Event, EventType, NewEvent};
pub use expense::{Expense, ExpensePatch, ExpenseStatus, NewExpense};
pub use lead::{Lead, LeadPatch, LeadStatus, NewLead};
pub use profile::{Employee, EmployeeForm};

use serde::{Deserialize, Deserializer};

/// Read a nullable text column into a plain value. `row_to_json` emits every
/// column, so a NULL arrives as an explicit `null` rather than a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
