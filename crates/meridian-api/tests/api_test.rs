//! HTTP API integration tests.
//!
//! Run with: `cargo test -p meridian-api --test api_test`

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use helpers::{api_path, mint_token, setup_test_app};
use meridian_core::Role;
use serde_json::{json, Value};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn ten_am() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_test_app();

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-content-type-options"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app();

    let response = app.client().get(&api_path("/openapi.json")).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["/api/v1/meetings"].is_object());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup_test_app();

    let response = app.client().get(&api_path("/meetings")).await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = setup_test_app();
    let user = app
        .services
        .store
        .seed_user(app.services.org_id(), "Maya", Role::Manager);
    let token = mint_token(&user, Duration::minutes(-5));

    let response = app
        .client()
        .get(&api_path("/meetings"))
        .add_header("Authorization", format!("Bearer {}", token))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let app = setup_test_app();
    let (_, manager) = app.login("Maya", Role::Manager);
    let (viewer, viewer_auth) = app.login("Vik", Role::AssociateViewer);

    let before = app
        .client()
        .get(&api_path("/meetings"))
        .add_header("Authorization", viewer_auth.clone())
        .await;
    assert_eq!(before.status_code(), 200);

    let response = app
        .client()
        .post(&api_path(&format!("/users/{}/deactivate", viewer.id)))
        .add_header("Authorization", manager)
        .await;
    assert_eq!(response.status_code(), 200);

    let after = app
        .client()
        .get(&api_path("/meetings"))
        .add_header("Authorization", viewer_auth)
        .await;
    assert_eq!(after.status_code(), 401);
}

#[tokio::test]
async fn test_viewer_cannot_create_meeting() {
    let app = setup_test_app();
    let client = app.services.store.seed_client(app.services.org_id(), "Ravi");
    let (_, viewer) = app.login("Vik", Role::AssociateViewer);

    let response = app
        .client()
        .post(&api_path("/meetings"))
        .add_header("Authorization", viewer)
        .json(&json!({
            "client_id": client.id,
            "meeting_date": "2099-01-10",
            "meeting_time": "10:00:00",
            "meeting_type": "online",
            "location": "Video call"
        }))
        .await;

    assert_eq!(response.status_code(), 403);
    assert!(app.services.store.meetings().is_empty());
}

#[tokio::test]
async fn test_manager_schedules_and_cancels_meeting() {
    let app = setup_test_app();
    let client = app.services.store.seed_client(app.services.org_id(), "Ravi");
    let (_, manager) = app.login("Maya", Role::Manager);

    let created = app
        .client()
        .post(&api_path("/meetings"))
        .add_header("Authorization", manager.clone())
        .json(&json!({
            "client_id": client.id,
            "meeting_date": "2099-01-10",
            "meeting_time": "10:00:00",
            "meeting_type": "face_to_face",
            "location": "Office"
        }))
        .await;
    assert_eq!(created.status_code(), 201);
    let meeting: Value = created.json();
    let id = meeting["id"].as_str().unwrap().to_string();

    let deleted = app
        .client()
        .delete(&api_path(&format!("/meetings/{}", id)))
        .add_header("Authorization", manager.clone())
        .await;
    assert_eq!(deleted.status_code(), 204);

    let missing = app
        .client()
        .get(&api_path(&format!("/meetings/{}", id)))
        .add_header("Authorization", manager)
        .await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_invalid_json_body_is_bad_request() {
    let app = setup_test_app();
    let (_, manager) = app.login("Maya", Role::Manager);

    let response = app
        .client()
        .post(&api_path("/meetings"))
        .add_header("Authorization", manager)
        .json(&json!({ "location": "Office" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_session_archives_past_meetings() {
    let app = setup_test_app();
    let org = app.services.org_id();
    let client = app.services.store.seed_client(org, "Ravi");
    app.services
        .store
        .seed_meeting(org, client.id, date("2020-03-01"), ten_am());
    let future = app
        .services
        .store
        .seed_meeting(org, client.id, date("2099-03-01"), ten_am());
    let (user, editor) = app.login("Esha", Role::AssociateEditor);

    let response = app
        .client()
        .get(&api_path("/session"))
        .add_header("Authorization", editor)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user_id"], user.id.to_string());
    assert_eq!(body["role"], "associate_editor");
    assert_eq!(body["archived"]["archived"], 1);

    let remaining = app.services.store.meetings();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, future.id);
    assert_eq!(app.services.store.history_records().len(), 1);
}

#[tokio::test]
async fn test_history_lists_newly_past_meetings() {
    let app = setup_test_app();
    let org = app.services.org_id();
    let client = app.services.store.seed_client(org, "Ravi");
    let past = app
        .services
        .store
        .seed_meeting(org, client.id, date("2021-06-01"), ten_am());
    let (_, viewer) = app.login("Vik", Role::AssociateViewer);

    let response = app
        .client()
        .get(&api_path("/history"))
        .add_header("Authorization", viewer)
        .await;

    assert_eq!(response.status_code(), 200);
    let records: Vec<Value> = response.json();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["original_meeting_id"], past.id.to_string());
    assert_eq!(records[0]["client_name"], "Ravi");
}

#[tokio::test]
async fn test_payments_due_in_month() {
    let app = setup_test_app();
    let client = app.services.store.seed_client(app.services.org_id(), "Ravi");
    let (_, manager) = app.login("Maya", Role::Manager);

    let created = app
        .client()
        .post(&api_path("/payments"))
        .add_header("Authorization", manager.clone())
        .json(&json!({
            "client_id": client.id,
            "amount": 2500,
            "due_dates": ["2024-01-15"],
            "frequency": "quarterly"
        }))
        .await;
    assert_eq!(created.status_code(), 201);

    let april = app
        .client()
        .get(&api_path("/payments/due"))
        .add_query_param("year", 2024)
        .add_query_param("month", 4)
        .add_header("Authorization", manager.clone())
        .await;
    assert_eq!(april.status_code(), 200);
    let due: Vec<Value> = april.json();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["due_date"], "2024-04-15");
    assert_eq!(due[0]["status"], "unpaid");

    let february = app
        .client()
        .get(&api_path("/payments/due"))
        .add_query_param("year", 2024)
        .add_query_param("month", 2)
        .add_header("Authorization", manager)
        .await;
    let due: Vec<Value> = february.json();
    assert!(due.is_empty());
}

#[tokio::test]
async fn test_payments_due_rejects_bad_month() {
    let app = setup_test_app();
    let (_, manager) = app.login("Maya", Role::Manager);

    let response = app
        .client()
        .get(&api_path("/payments/due"))
        .add_query_param("year", 2024)
        .add_query_param("month", 13)
        .add_header("Authorization", manager)
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_payments_due_rejects_year_beyond_calendar() {
    let app = setup_test_app();
    let (_, manager) = app.login("Maya", Role::Manager);

    let response = app
        .client()
        .get(&api_path("/payments/due"))
        .add_query_param("year", i32::MAX)
        .add_query_param("month", 2)
        .add_header("Authorization", manager)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_attachment_upload_and_signed_download() {
    let app = setup_test_app();
    let org = app.services.org_id();
    let client = app.services.store.seed_client(org, "Ravi");
    let meeting = app
        .services
        .store
        .seed_meeting(org, client.id, date("2099-05-01"), ten_am());
    let (_, editor) = app.login("Esha", Role::AssociateEditor);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.4 minutes".to_vec())
            .file_name("agenda.pdf")
            .mime_type("application/pdf"),
    );
    let response = app
        .client()
        .post(&api_path(&format!("/meetings/{}/attachments", meeting.id)))
        .add_header("Authorization", editor.clone())
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 200);

    let updated: Value = response.json();
    let path = updated["attachments"][0]["storage_path"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(app.services.storage.contains(&path));

    let url = app
        .client()
        .get(&api_path(&format!("/meetings/{}/attachments/url", meeting.id)))
        .add_query_param("path", &path)
        .add_header("Authorization", editor)
        .await;
    assert_eq!(url.status_code(), 200);

    let token = app
        .state
        .files
        .signer
        .sign(&path, Utc::now() + Duration::minutes(5))
        .unwrap();
    let download = app
        .client()
        .get(&api_path(&format!("/files/{}", token)))
        .await;
    assert_eq!(download.status_code(), 200);
    assert_eq!(download.as_bytes().as_ref(), b"%PDF-1.4 minutes");
    assert_eq!(
        download.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = setup_test_app();
    let org = app.services.org_id();
    let client = app.services.store.seed_client(org, "Ravi");
    let meeting = app
        .services
        .store
        .seed_meeting(org, client.id, date("2099-05-01"), ten_am());
    let (_, editor) = app.login("Esha", Role::AssociateEditor);

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = app
        .client()
        .post(&api_path(&format!("/meetings/{}/attachments", meeting.id)))
        .add_header("Authorization", editor)
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    assert!(app.services.storage.keys().is_empty());
}

#[tokio::test]
async fn test_tampered_file_token_is_unauthorized() {
    let app = setup_test_app();

    let response = app
        .client()
        .get(&api_path("/files/not-a-real-token"))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_integration_token_status_hides_secret() {
    let app = setup_test_app();
    let (_, viewer) = app.login("Vik", Role::AssociateViewer);

    let stored = app
        .client()
        .put(&api_path("/integrations/google/token"))
        .add_header("Authorization", viewer.clone())
        .json(&json!({
            "access_token": "ya29.secret-access",
            "refresh_token": "1//refresh"
        }))
        .await;
    assert_eq!(stored.status_code(), 204);

    let status = app
        .client()
        .get(&api_path("/integrations/google/token"))
        .add_header("Authorization", viewer)
        .await;
    assert_eq!(status.status_code(), 200);
    assert!(!status.text().contains("ya29.secret-access"));

    let body: Value = status.json();
    assert_eq!(body["connected"], true);
    assert_eq!(body["has_refresh_token"], true);
}

#[tokio::test]
async fn test_mutations_are_audited() {
    let app = setup_test_app();
    let (_, manager) = app.login("Maya", Role::Manager);

    let created = app
        .client()
        .post(&api_path("/clients"))
        .add_header("Authorization", manager.clone())
        .json(&json!({ "name": "Nisha", "client_type": "mutual_funds" }))
        .await;
    assert_eq!(created.status_code(), 201);

    let activity = app
        .client()
        .get(&api_path("/activity"))
        .add_header("Authorization", manager)
        .await;
    assert_eq!(activity.status_code(), 200);
    let entries: Vec<Value> = activity.json();
    assert!(entries.iter().any(|e| e["collection"] == "clients"));
}
