use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use super::manager::DatabaseManager;

/// Record kinds the gateway reads and writes. Each maps to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Expenses,
    Leads,
    Events,
    Profiles,
}

impl RecordKind {
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Expenses => "expenses",
            RecordKind::Leads => "leads",
            RecordKind::Events => "events",
            RecordKind::Profiles => "profiles",
        }
    }

    /// Columns a field set may name
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Expenses => &[
                "id", "description", "amount", "date", "status", "receipt_url", "submitted_by", "created_at",
            ],
            RecordKind::Leads => &[
                "id", "business_name", "contact_name", "email", "phone", "description", "status", "created_at",
            ],
            RecordKind::Events => &["id", "title", "date", "type", "assignee", "created_by", "created_at"],
            RecordKind::Profiles => &["id", "full_name", "role", "position", "phone", "email", "created_at"],
        }
    }

    /// Reject field names outside the column list
    pub fn check_fields(&self, fields: &Map<String, Value>) -> Result<(), StoreError> {
        match fields.keys().find(|k| !self.columns().contains(&k.as_str())) {
            Some(column) => Err(StoreError::UnknownColumn {
                table: self.table(),
                column: column.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn newest_first() -> Self {
        Self { column: "created_at", direction: SortDirection::Desc }
    }

    pub fn ascending(column: &'static str) -> Self {
        Self { column, direction: SortDirection::Asc }
    }
}

/// Record store failures. The display string is the provider's message,
/// passed through to the caller after the action's failure label.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown column '{column}' for {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("{0}")]
    Query(String),

    #[error("unexpected row format: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => StoreError::Query(db.message().to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Convert a typed field set into a column map, dropping absent fields
pub fn fields_of<T: Serialize>(value: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Decode(format!("expected an object, got {}", other))),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

/// Generic CRUD over record kinds. Rows travel as JSON objects keyed by column.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, kind: RecordKind, order: OrderBy) -> Result<Vec<Value>, StoreError>;

    /// Insert one row and return it as stored (with generated id and timestamps)
    async fn insert(&self, kind: RecordKind, fields: Map<String, Value>) -> Result<Value, StoreError>;

    /// Insert many rows in one statement; returns the number inserted
    async fn insert_many(&self, kind: RecordKind, rows: Vec<Map<String, Value>>) -> Result<u64, StoreError>;

    /// Apply a partial field set to the row with this id
    async fn update(&self, kind: RecordKind, id: Uuid, patch: Map<String, Value>) -> Result<(), StoreError>;

    async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Postgres record store. Field sets are bound as a single jsonb parameter and
/// spread into columns with `jsonb_populate_record`, so column types come from
/// the table definition.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn column_list(fields: &Map<String, Value>) -> String {
        fields
            .keys()
            .map(|k| DatabaseManager::quote_identifier(k))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn union_columns(rows: &[Map<String, Value>]) -> Map<String, Value> {
        let mut all = Map::new();
        for row in rows {
            for key in row.keys() {
                all.entry(key.clone()).or_insert(Value::Null);
            }
        }
        all
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn select(&self, kind: RecordKind, order: OrderBy) -> Result<Vec<Value>, StoreError> {
        if !kind.columns().contains(&order.column) {
            return Err(StoreError::UnknownColumn { table: kind.table(), column: order.column.to_string() });
        }

        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} ORDER BY {} {}) t",
            DatabaseManager::quote_identifier(kind.table()),
            DatabaseManager::quote_identifier(order.column),
            order.direction.to_sql()
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(StoreError::from))
            .collect()
    }

    async fn insert(&self, kind: RecordKind, fields: Map<String, Value>) -> Result<Value, StoreError> {
        kind.check_fields(&fields)?;
        let table = DatabaseManager::quote_identifier(kind.table());
        let columns = Self::column_list(&fields);

        let sql = format!(
            "WITH inserted AS (\
                INSERT INTO {table} ({columns}) \
                SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
                RETURNING *\
            ) SELECT row_to_json(inserted) AS row FROM inserted"
        );

        let row = sqlx::query(&sql)
            .bind(Json(Value::Object(fields)))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<Value, _>("row")?)
    }

    async fn insert_many(&self, kind: RecordKind, rows: Vec<Map<String, Value>>) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in &rows {
            kind.check_fields(row)?;
        }
        let table = DatabaseManager::quote_identifier(kind.table());
        let columns = Self::column_list(&Self::union_columns(&rows));

        let sql = format!(
            "INSERT INTO {table} ({columns}) \
             SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, $1)"
        );

        let payload = Value::Array(rows.into_iter().map(Value::Object).collect());
        let result = sqlx::query(&sql).bind(Json(payload)).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn update(&self, kind: RecordKind, id: Uuid, patch: Map<String, Value>) -> Result<(), StoreError> {
        kind.check_fields(&patch)?;
        if patch.is_empty() {
            return Ok(());
        }
        let table = DatabaseManager::quote_identifier(kind.table());
        let columns = Self::column_list(&patch);

        let sql = format!(
            "UPDATE {table} SET ({columns}) = \
             (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)) \
             WHERE \"id\" = $2"
        );

        sqlx::query(&sql)
            .bind(Json(Value::Object(patch)))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE \"id\" = $1",
            DatabaseManager::quote_identifier(kind.table())
        );
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await.map_err(|e| match e {
            super::manager::DatabaseError::Sqlx(err) => StoreError::from(err),
            other => StoreError::Query(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_fields_outside_the_column_list() {
        let fields = fields_of(&json!({ "status": "Hot", "owner; DROP TABLE leads": 1 })).unwrap();
        let err = RecordKind::Leads.check_fields(&fields).unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { table: "leads", .. }));
    }

    #[test]
    fn accepts_known_columns() {
        let fields = fields_of(&json!({ "title": "Standup", "type": "Meeting" })).unwrap();
        assert!(RecordKind::Events.check_fields(&fields).is_ok());
    }

    #[test]
    fn fields_of_requires_an_object() {
        assert!(matches!(fields_of(&json!([1, 2])), Err(StoreError::Decode(_))));
    }

    #[test]
    fn union_columns_covers_every_row() {
        let rows = vec![
            fields_of(&json!({ "business_name": "Acme" })).unwrap(),
            fields_of(&json!({ "business_name": "Globex", "email": "a@globex.test" })).unwrap(),
        ];
        let all = PgRecordStore::union_columns(&rows);
        assert_eq!(PgRecordStore::column_list(&all), "\"business_name\", \"email\"");
    }
}
