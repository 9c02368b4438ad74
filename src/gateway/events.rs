use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{decode_rows, required, ActionOutcome, ActionResult, GatewayError, MutationGateway, Requirement};
use crate::auth::SessionToken;
use crate::database::models::{Event, EventType, NewEvent};
use crate::database::{fields_of, OrderBy, RecordKind};
use crate::refresh::View;

#[derive(Serialize)]
struct EventInsert<'a> {
    title: &'a str,
    date: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: EventType,
    assignee: Uuid,
    created_by: Uuid,
}

impl MutationGateway {
    /// Calendar entries, earliest first
    pub async fn list_events(&self, credential: Option<&SessionToken>) -> Result<Vec<Event>, GatewayError> {
        self.authorize(credential, Requirement::Authenticated).await?;
        let rows = self
            .records
            .select(RecordKind::Events, OrderBy::ascending("date"))
            .await
            .map_err(|e| GatewayError::provider("Failed to load events", e))?;
        decode_rows(rows, "Failed to load events")
    }

    pub async fn create_event(&self, credential: Option<&SessionToken>, form: NewEvent) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;

        let (title, date) = match (required(&form.title), form.date) {
            (Some(title), Some(date)) => (title, date),
            _ => return Err(GatewayError::missing_fields()),
        };

        let insert = EventInsert {
            title,
            date,
            kind: form.kind.unwrap_or_default(),
            assignee: form.assignee.unwrap_or(actor.id),
            created_by: actor.id,
        };
        let fields = fields_of(&insert).map_err(|e| GatewayError::provider("Failed to create event", e))?;

        match self.records.insert(RecordKind::Events, fields).await {
            Ok(row) => {
                tracing::info!("{:?} scheduled for {} by {}", insert.kind, date, actor.id);
                self.mark_stale(View::Calendar);
                Ok(ActionOutcome::ok("Event created successfully").with_data(row))
            }
            Err(e) => {
                tracing::error!("Creating event failed: {}", e);
                Err(GatewayError::provider("Failed to create event", e))
            }
        }
    }
}
