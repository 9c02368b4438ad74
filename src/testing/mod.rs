//! In-memory collaborators for exercising the gateway without Postgres or
//! an auth provider. Every double counts or records the calls it receives.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::accounts::{Account, AccountAdmin, AccountError, UserMetadata};
use crate::auth::{Identity, SessionResolver, SessionToken};
use crate::database::{OrderBy, RecordKind, RecordStore, RoleStore, SortDirection, StoreError};
use crate::gateway::MutationGateway;
use crate::refresh::{RefreshSignal, View};
use crate::types::Role;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session table keyed by raw token
#[derive(Default)]
pub struct StaticSessions {
    sessions: Mutex<HashMap<String, Identity>>,
}

impl StaticSessions {
    pub fn insert(&self, token: &SessionToken, identity: Identity) {
        lock(&self.sessions).insert(token.as_str().to_string(), identity);
    }

    pub fn revoke(&self, token: &SessionToken) {
        lock(&self.sessions).remove(token.as_str());
    }
}

#[async_trait]
impl SessionResolver for StaticSessions {
    async fn resolve(&self, token: &SessionToken) -> Option<Identity> {
        lock(&self.sessions).get(token.as_str()).cloned()
    }
}

/// Profile roles that can change between calls
#[derive(Default)]
pub struct InMemoryRoles {
    roles: Mutex<HashMap<Uuid, Role>>,
    lookups: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl InMemoryRoles {
    pub fn set_role(&self, id: Uuid, role: Role) {
        lock(&self.roles).insert(id, role);
    }

    pub fn remove(&self, id: Uuid) {
        lock(&self.roles).remove(&id);
    }

    /// Fail every following lookup with this message
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for InMemoryRoles {
    async fn role_of(&self, actor_id: Uuid) -> Result<Option<Role>, StoreError> {
        self.lookups.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = lock(&self.failure).clone() {
            return Err(StoreError::Query(message));
        }
        Ok(lock(&self.roles).get(&actor_id).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCall {
    Invite { email: String, metadata: UserMetadata },
    Create { email: String, password: String, metadata: UserMetadata },
    Delete { id: Uuid },
}

/// Account provider that records every call, successful or not
#[derive(Default)]
pub struct RecordingAccounts {
    calls: Mutex<Vec<AccountCall>>,
    failure: Mutex<Option<String>>,
}

impl RecordingAccounts {
    pub fn calls(&self) -> Vec<AccountCall> {
        lock(&self.calls).clone()
    }

    /// Reject every following call with this provider message
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    fn record(&self, call: AccountCall) -> Result<(), AccountError> {
        lock(&self.calls).push(call);
        match lock(&self.failure).clone() {
            Some(message) => Err(AccountError::Rejected(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AccountAdmin for RecordingAccounts {
    async fn invite_user_by_email(&self, email: &str, metadata: &UserMetadata) -> Result<Account, AccountError> {
        self.record(AccountCall::Invite {
            email: email.to_string(),
            metadata: metadata.clone(),
        })?;
        Ok(Account {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        })
    }

    async fn create_user(&self, email: &str, password: &str, metadata: &UserMetadata) -> Result<Account, AccountError> {
        self.record(AccountCall::Create {
            email: email.to_string(),
            password: password.to_string(),
            metadata: metadata.clone(),
        })?;
        Ok(Account {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        })
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AccountError> {
        self.record(AccountCall::Delete { id })
    }
}

/// Record tables held as JSON rows in insertion order.
/// Generated `created_at` values are strictly increasing.
pub struct InMemoryRecords {
    tables: Mutex<HashMap<RecordKind, Vec<Value>>>,
    calls: AtomicUsize,
    failure: Mutex<Option<String>>,
    clock: Mutex<DateTime<Utc>>,
}

impl Default for InMemoryRecords {
    fn default() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            clock: Mutex::new(Utc::now()),
        }
    }
}

impl InMemoryRecords {
    /// Store calls made through the `RecordStore` trait
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    pub fn rows(&self, kind: RecordKind) -> Vec<Value> {
        lock(&self.tables).get(&kind).cloned().unwrap_or_default()
    }

    pub fn row(&self, kind: RecordKind, id: Uuid) -> Option<Value> {
        let id = json!(id);
        self.rows(kind).into_iter().find(|row| row.get("id") == Some(&id))
    }

    /// Put a row in place without counting a call. Returns its id.
    pub fn seed(&self, kind: RecordKind, row: Value) -> Uuid {
        let fields = match row {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let stored = self.store_row(kind, fields);
        stored
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or_default()
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        match lock(&self.failure).clone() {
            Some(message) => Err(StoreError::Query(message)),
            None => Ok(()),
        }
    }

    fn next_timestamp(&self) -> String {
        let mut clock = lock(&self.clock);
        let now = Utc::now();
        *clock = if now > *clock { now } else { *clock + Duration::milliseconds(1) };
        clock.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn store_row(&self, kind: RecordKind, mut fields: Map<String, Value>) -> Value {
        fields.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
        if !fields.contains_key("created_at") {
            fields.insert("created_at".to_string(), Value::String(self.next_timestamp()));
        }
        let row = Value::Object(fields);
        lock(&self.tables).entry(kind).or_default().push(row.clone());
        row
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) | (Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None) | (Some(_), Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for InMemoryRecords {
    async fn select(&self, kind: RecordKind, order: OrderBy) -> Result<Vec<Value>, StoreError> {
        self.begin()?;
        let mut rows = self.rows(kind);
        rows.sort_by(|a, b| {
            let ordering = compare_values(a.get(order.column), b.get(order.column));
            match order.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        Ok(rows)
    }

    async fn insert(&self, kind: RecordKind, fields: Map<String, Value>) -> Result<Value, StoreError> {
        self.begin()?;
        kind.check_fields(&fields)?;
        Ok(self.store_row(kind, fields))
    }

    async fn insert_many(&self, kind: RecordKind, rows: Vec<Map<String, Value>>) -> Result<u64, StoreError> {
        self.begin()?;
        for row in &rows {
            kind.check_fields(row)?;
        }
        let count = rows.len() as u64;
        for row in rows {
            self.store_row(kind, row);
        }
        Ok(count)
    }

    async fn update(&self, kind: RecordKind, id: Uuid, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.begin()?;
        kind.check_fields(&patch)?;
        let id = json!(id);
        let mut tables = lock(&self.tables);
        if let Some(Value::Object(row)) = tables
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|row| row.get("id") == Some(&id)))
        {
            row.extend(patch);
        }
        Ok(())
    }

    async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<(), StoreError> {
        self.begin()?;
        let id = json!(id);
        if let Some(rows) = lock(&self.tables).get_mut(&kind) {
            rows.retain(|row| row.get("id") != Some(&id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.begin()
    }
}

/// Collects stale notifications in order
#[derive(Default)]
pub struct RecordingRefresh {
    signals: Mutex<Vec<View>>,
}

impl RecordingRefresh {
    pub fn signals(&self) -> Vec<View> {
        lock(&self.signals).clone()
    }
}

impl RefreshSignal for RecordingRefresh {
    fn mark_stale(&self, view: View) {
        lock(&self.signals).push(view);
    }
}

/// One set of doubles shared by every gateway it builds
pub struct TestHarness {
    pub sessions: Arc<StaticSessions>,
    pub roles: Arc<InMemoryRoles>,
    pub records: Arc<InMemoryRecords>,
    pub refresh: Arc<RecordingRefresh>,
    pub accounts: Arc<RecordingAccounts>,
    accounts_configured: bool,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            sessions: Arc::default(),
            roles: Arc::default(),
            records: Arc::default(),
            refresh: Arc::default(),
            accounts: Arc::default(),
            accounts_configured: true,
        }
    }

    /// Harness whose gateways have no service role key
    pub fn without_accounts() -> Self {
        Self {
            accounts_configured: false,
            ..Self::new()
        }
    }

    pub fn gateway(&self) -> MutationGateway {
        let gateway = MutationGateway::new(
            self.sessions.clone(),
            self.roles.clone(),
            self.records.clone(),
            self.refresh.clone(),
        );
        if self.accounts_configured {
            gateway.with_accounts(self.accounts.clone())
        } else {
            gateway
        }
    }

    /// Register a fresh session whose profile holds `role`
    pub fn sign_in(&self, role: Role) -> (SessionToken, Uuid) {
        let id = Uuid::new_v4();
        let token = SessionToken::new(format!("session-{}", id.simple()));
        self.sessions.insert(
            &token,
            Identity {
                id,
                email: Some(format!("{}@example.com", id.simple())),
            },
        );
        self.roles.set_role(id, role);
        (token, id)
    }

    pub fn seed(&self, kind: RecordKind, row: Value) -> Uuid {
        self.records.seed(kind, row)
    }

    pub fn seed_profile(&self, id: Uuid, full_name: &str, role: Role) -> Uuid {
        self.records.seed(
            RecordKind::Profiles,
            json!({ "id": id, "full_name": full_name, "role": role }),
        )
    }
}
