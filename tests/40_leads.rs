mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;
use crm_gateway::database::RecordKind;
use crm_gateway::refresh::View;
use crm_gateway::types::Role;

#[tokio::test]
async fn status_only_update_leaves_other_fields() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.harness.sign_in(Role::User);
    let id = app.harness.seed(
        RecordKind::Leads,
        json!({
            "business_name": "Northwind",
            "contact_name": "Alex Kim",
            "email": "alex@northwind.test",
            "phone": "555-0199",
            "description": "Wants a demo",
            "status": "Warm"
        }),
    );
    let before = app.harness.records.row(RecordKind::Leads, id).unwrap_or_default();

    let (status, body) = app
        .send(Method::PATCH, &format!("/api/leads/{}", id), Some(&token), Some(json!({ "status": "Hot" })))
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Lead updated successfully" }));
    let after = app.harness.records.row(RecordKind::Leads, id).unwrap_or_default();
    let mut expected = before;
    expected["status"] = json!("Hot");
    assert_eq!(after, expected);
    assert_eq!(app.harness.refresh.signals(), vec![View::Leads]);
    Ok(())
}

#[tokio::test]
async fn csv_import_creates_cold_leads() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.harness.sign_in(Role::User);
    let document = "BusinessName,ContactName,Email,Phone,Description\n\
                    Contoso,Pat Lee,pat@contoso.test,555-0110,Trade show\n\
                    Fabrikam,,info@fabrikam.test,,\n";

    let (status, body) = app
        .send_raw(Method::POST, "/api/leads/import", Some(&token), "text/csv", document.into())
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Imported 2 leads" }));
    assert_eq!(app.harness.records.calls(), 1);

    let (_, body) = app.send(Method::GET, "/api/leads", Some(&token), None).await?;
    let leads = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(leads.len(), 2);
    assert!(leads.iter().all(|lead| lead["status"] == "Cold"));
    let fabrikam = leads
        .iter()
        .find(|lead| lead["business_name"] == "Fabrikam")
        .cloned()
        .unwrap_or_default();
    assert_eq!(fabrikam["contact_name"], "Unknown");
    assert_eq!(fabrikam["phone"], "");
    Ok(())
}

#[tokio::test]
async fn empty_csv_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.harness.sign_in(Role::User);

    let (status, body) = app
        .send_raw(Method::POST, "/api/leads/import", Some(&token), "text/csv", "BusinessName,Email\n".into())
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "CSV contains no leads" }));
    assert_eq!(app.harness.records.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn create_and_delete() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.harness.sign_in(Role::User);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/leads",
            Some(&token),
            Some(json!({ "business_name": "Tailspin Toys", "email": "buy@tailspin.test", "status": "Warm" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lead created successfully");
    assert_eq!(body["data"]["status"], "Warm");
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = app.send(Method::DELETE, &format!("/api/leads/{}", id), Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Lead deleted successfully" }));
    assert!(app.harness.records.rows(RecordKind::Leads).is_empty());
    assert_eq!(app.harness.refresh.signals(), vec![View::Leads, View::Leads]);
    Ok(())
}

#[tokio::test]
async fn blank_business_name_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.harness.sign_in(Role::User);

    let (status, body) = app
        .send(Method::POST, "/api/leads", Some(&token), Some(json!({ "business_name": "   " })))
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));
    Ok(())
}

#[tokio::test]
async fn lists_leads_with_null_columns() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.harness.sign_in(Role::User);
    app.harness.seed(
        RecordKind::Leads,
        json!({
            "business_name": "Initech",
            "contact_name": null,
            "email": null,
            "phone": null,
            "description": null,
            "status": "Cold"
        }),
    );

    let (status, body) = app.send(Method::GET, "/api/leads", Some(&token), None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Loaded 1 leads");
    assert_eq!(body["data"][0]["business_name"], "Initech");
    assert_eq!(body["data"][0]["phone"], "");
    assert_eq!(body["data"][0]["description"], "");
    Ok(())
}
