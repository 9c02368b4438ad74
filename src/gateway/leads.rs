use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{decode_rows, required, ActionOutcome, ActionResult, GatewayError, MutationGateway, Requirement};
use crate::auth::SessionToken;
use crate::database::models::{Lead, LeadPatch, LeadStatus, NewLead};
use crate::database::{fields_of, OrderBy, RecordKind};
use crate::refresh::View;

/// Accepted header spellings for each imported lead column
const CSV_COLUMNS: [(&str, [&str; 2], &str); 5] = [
    ("business_name", ["BusinessName", "business_name"], "Unknown"),
    ("contact_name", ["ContactName", "contact_name"], "Unknown"),
    ("email", ["Email", "email"], ""),
    ("phone", ["Phone", "phone"], ""),
    ("description", ["Description", "description"], ""),
];

/// Parse a lead spreadsheet export. The first row must be a header row.
/// Every imported lead starts `Cold`.
pub fn parse_leads_csv(document: &str) -> Result<Vec<NewLead>, GatewayError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(document.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| GatewayError::Validation(format!("Invalid CSV: {}", e)))?
        .clone();
    let positions: Vec<Vec<usize>> = CSV_COLUMNS
        .iter()
        .map(|(_, aliases, _)| {
            aliases
                .iter()
                .filter_map(|alias| headers.iter().position(|h| h == *alias))
                .collect()
        })
        .collect();

    let mut leads = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| GatewayError::Validation(format!("Invalid CSV at row {}: {}", line + 1, e)))?;

        let mut values = CSV_COLUMNS
            .iter()
            .zip(&positions)
            .map(|((_, _, fallback), at)| first_present(&record, at).unwrap_or(*fallback).to_string());

        // Order matches CSV_COLUMNS
        leads.push(NewLead {
            business_name: values.next(),
            contact_name: values.next(),
            email: values.next(),
            phone: values.next(),
            description: values.next(),
            status: Some(LeadStatus::Cold),
        });
    }

    if leads.is_empty() {
        return Err(GatewayError::Validation("CSV contains no leads".to_string()));
    }
    Ok(leads)
}

fn first_present<'r>(record: &'r StringRecord, positions: &[usize]) -> Option<&'r str> {
    positions
        .iter()
        .filter_map(|&i| record.get(i))
        .find(|v| !v.is_empty())
}

/// Fill the empty-string defaults a stored lead carries
fn lead_fields(lead: NewLead) -> Result<Map<String, Value>, GatewayError> {
    let complete = NewLead {
        business_name: lead.business_name,
        contact_name: Some(lead.contact_name.unwrap_or_default()),
        email: Some(lead.email.unwrap_or_default()),
        phone: Some(lead.phone.unwrap_or_default()),
        description: Some(lead.description.unwrap_or_default()),
        status: Some(lead.status.unwrap_or_default()),
    };
    fields_of(&complete).map_err(|e| GatewayError::provider("Failed to create lead", e))
}

impl MutationGateway {
    pub async fn list_leads(&self, credential: Option<&SessionToken>) -> Result<Vec<Lead>, GatewayError> {
        self.authorize(credential, Requirement::Authenticated).await?;
        let rows = self
            .records
            .select(RecordKind::Leads, OrderBy::newest_first())
            .await
            .map_err(|e| GatewayError::provider("Failed to load leads", e))?;
        decode_rows(rows, "Failed to load leads")
    }

    pub async fn create_lead(&self, credential: Option<&SessionToken>, form: NewLead) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;

        let business_name = required(&form.business_name)
            .ok_or_else(GatewayError::missing_fields)?
            .to_string();
        let fields = lead_fields(NewLead { business_name: Some(business_name), ..form })?;

        match self.records.insert(RecordKind::Leads, fields).await {
            Ok(row) => {
                tracing::info!("Lead created by {}", actor.id);
                self.mark_stale(View::Leads);
                Ok(ActionOutcome::ok("Lead created successfully").with_data(row))
            }
            Err(e) => {
                tracing::error!("Creating lead failed: {}", e);
                Err(GatewayError::provider("Failed to create lead", e))
            }
        }
    }

    /// Bulk import from a CSV document. The whole document is parsed before
    /// anything is written, then every row goes out in one insert.
    pub async fn import_leads_csv(&self, credential: Option<&SessionToken>, document: &str) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;

        let leads = parse_leads_csv(document).map_err(|e| {
            tracing::warn!("Rejected lead import from {}: {}", actor.id, e);
            e
        })?;
        let rows = leads.into_iter().map(lead_fields).collect::<Result<Vec<_>, _>>()?;

        match self.records.insert_many(RecordKind::Leads, rows).await {
            Ok(count) => {
                tracing::info!("Imported {} leads for {}", count, actor.id);
                self.mark_stale(View::Leads);
                Ok(ActionOutcome::ok(format!("Imported {} leads", count)))
            }
            Err(e) => {
                tracing::error!("Lead import failed: {}", e);
                Err(GatewayError::provider("Failed to import leads", e))
            }
        }
    }

    /// Apply a partial update, e.g. a status change from the pipeline board
    pub async fn update_lead(&self, credential: Option<&SessionToken>, id: Uuid, patch: LeadPatch) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;
        let fields = fields_of(&patch).map_err(|e| GatewayError::provider("Failed to update lead", e))?;

        match self.records.update(RecordKind::Leads, id, fields).await {
            Ok(()) => {
                tracing::info!("Lead {} updated by {}", id, actor.id);
                self.mark_stale(View::Leads);
                Ok(ActionOutcome::ok("Lead updated successfully"))
            }
            Err(e) => {
                tracing::error!("Updating lead {} failed: {}", id, e);
                Err(GatewayError::provider("Failed to update lead", e))
            }
        }
    }

    pub async fn delete_lead(&self, credential: Option<&SessionToken>, id: Uuid) -> ActionResult {
        let actor = self.authorize(credential, Requirement::Authenticated).await?;

        match self.records.delete(RecordKind::Leads, id).await {
            Ok(()) => {
                tracing::info!("Lead {} deleted by {}", id, actor.id);
                self.mark_stale(View::Leads);
                Ok(ActionOutcome::ok("Lead deleted successfully"))
            }
            Err(e) => {
                tracing::error!("Deleting lead {} failed: {}", id, e);
                Err(GatewayError::provider("Failed to delete lead", e))
            }
        }
    }
}
