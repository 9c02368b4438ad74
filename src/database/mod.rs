pub mod manager;
pub mod models;
pub mod record_store;
pub mod role_store;

pub use manager::{DatabaseError, DatabaseManager};
pub use record_store::{fields_of, OrderBy, PgRecordStore, RecordKind, RecordStore, SortDirection, StoreError};
pub use role_store::{PgRoleStore, RoleStore};
