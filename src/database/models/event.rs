use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventType {
    #[default]
    Meeting,
    Task,
    Call,
}

/// Row of the `events` table (calendar entries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default)]
    pub assignee: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<EventType>,
    /// Profile id of the assignee; the caller when omitted
    pub assignee: Option<Uuid>,
}
