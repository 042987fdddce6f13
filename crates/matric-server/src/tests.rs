//! Router tests over the full stack: real in-memory store, buffer transport.

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use matric_core::{store::CrmStore, student::StatusPolicy};
use matric_mailer::BufferTransport;
use matric_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, Assignment, router};

async fn app_with_policy(
  policy: StatusPolicy,
) -> (Router, SqliteStore, BufferTransport) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let transport = BufferTransport::new();
  let state = AppState::new(
    store.clone(),
    transport.clone(),
    "crm@example.com",
    policy,
    Assignment::FirstActive.policy(),
  );
  (router(state), store, transport)
}

async fn app() -> (Router, SqliteStore, BufferTransport) {
  app_with_policy(StatusPolicy::Unrestricted).await
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    .body(Body::from(body.to_owned()))
    .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

// ─── Webhook ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn webhook_creates_student_from_fresh_payload() {
  let (app, store, _) = app().await;

  let payload = json!({
    "source": "facebook",
    "full_name": "Ali Khan",
    "email": "ali@example.com",
    "phone": "+923001234567",
    "country": "Pakistan",
  });
  let (status, body) =
    send(&app, json_request("POST", "/webhooks/leads", payload)).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
  assert_eq!(body["new_student"], true);

  let student_id = body["student_id"].as_i64().unwrap();
  let student = store.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.first_name, "Ali");
  assert_eq!(student.last_name, "Khan");

  let countries = store.list_countries().await.unwrap();
  assert!(countries.iter().any(|c| c.name == "Pakistan"));

  let tags = store.student_tags(student_id).await.unwrap();
  assert!(tags.iter().any(|t| t.name == "Facebook Lead"));

  let activity = store.student_activity(student_id, 10).await.unwrap();
  assert_eq!(activity.len(), 1);
  assert_eq!(activity[0].action, "lead_created");
}

#[tokio::test]
async fn webhook_links_existing_student() {
  let (app, store, _) = app().await;

  let first = json!({ "full_name": "Ali Khan", "phone": "+923001234567" });
  let (_, body) = send(&app, json_request("POST", "/webhooks/leads", first.clone())).await;
  let student_id = body["student_id"].as_i64().unwrap();

  let (_, body) = send(&app, json_request("POST", "/webhooks/leads", first)).await;
  assert_eq!(body["new_student"], false);
  assert_eq!(body["student_id"].as_i64().unwrap(), student_id);

  // Two leads, one student.
  assert_eq!(store.list_leads(1).await.unwrap().total, 2);
}

#[tokio::test]
async fn webhook_rejects_malformed_json() {
  let (app, store, _) = app().await;

  let request = Request::builder()
    .method("POST")
    .uri("/webhooks/leads")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let (status, body) = send(&app, request).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["status"], "error");
  assert_eq!(body["message"], "Invalid JSON");
  assert_eq!(store.list_leads(1).await.unwrap().total, 0);
}

// ─── Application status ──────────────────────────────────────────────────────

async fn create_student(app: &Router, first: &str) -> i64 {
  let (status, body) = send(
    app,
    json_request(
      "POST",
      "/students",
      json!({ "first_name": first, "last_name": "Test", "email": format!("{first}@example.com") }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn status_update_happy_path() {
  let (app, _, _) = app().await;
  let id = create_student(&app, "ana").await;

  let (status, body) = send(
    &app,
    form_request("/applications/status", &format!("id={id}&status=approved")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn status_update_rejects_invalid_status() {
  let (app, _, _) = app().await;
  let id = create_student(&app, "ben").await;

  let (status, body) = send(
    &app,
    form_request("/applications/status", &format!("id={id}&status=bogus")),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn status_update_unknown_id_is_404() {
  let (app, _, _) = app().await;

  let (status, body) =
    send(&app, form_request("/applications/status", "id=999&status=approved")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn status_update_respects_pipeline_policy() {
  let (app, _, _) = app_with_policy(StatusPolicy::Pipeline).await;
  let id = create_student(&app, "cyn").await;

  // pending -> approved skips the review step.
  let (status, body) = send(
    &app,
    form_request("/applications/status", &format!("id={id}&status=approved")),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);

  let (status, _) = send(
    &app,
    form_request("/applications/status", &format!("id={id}&status=under_review")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn applications_listing_includes_counts() {
  let (app, _, _) = app().await;
  let id = create_student(&app, "dia").await;
  create_student(&app, "eli").await;
  send(
    &app,
    form_request("/applications/status", &format!("id={id}&status=approved")),
  )
  .await;

  let (status, body) = send(&app, get_request("/applications?status=approved")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["applications"]["total"], 1);
  assert_eq!(body["stats"]["total_apps"], 2);
  assert_eq!(body["stats"]["approved_count"], 1);
  assert_eq!(body["stats"]["pending_count"], 1);
}

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn student_detail_carries_tags_documents_activity() {
  let (app, _, _) = app().await;
  let id = create_student(&app, "fay").await;

  let (status, doc) = send(
    &app,
    json_request(
      "POST",
      &format!("/students/{id}/documents"),
      json!({ "title": "Transcript", "file_name": "transcript.pdf" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert!(doc["file_path"].as_str().unwrap().ends_with("/transcript.pdf"));

  let (status, body) = send(&app, get_request(&format!("/students/{id}"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["student"]["first_name"], "fay");
  assert_eq!(body["documents"].as_array().unwrap().len(), 1);
  // The upload left an activity row.
  assert_eq!(body["activity"][0]["action"], "uploaded_document");
}

#[tokio::test]
async fn student_archive_hides_from_listing() {
  let (app, _, _) = app().await;
  let id = create_student(&app, "gus").await;
  create_student(&app, "hal").await;

  let (status, _) = send(
    &app,
    json_request("POST", &format!("/students/{id}/archive"), json!({})),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, body) = send(&app, get_request("/students")).await;
  assert_eq!(body["total"], 1);
  let (_, body) = send(&app, get_request("/students?archived=true")).await;
  assert_eq!(body["total"], 1);
  assert_eq!(body["items"][0]["first_name"], "gus");
}

#[tokio::test]
async fn student_update_missing_is_404() {
  let (app, _, _) = app().await;
  let (status, _) = send(
    &app,
    json_request("PUT", "/students/99", json!({ "first_name": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_email_endpoint_sends_and_logs() {
  let (app, _, transport) = app().await;
  let id = create_student(&app, "ida").await;

  let (status, log) = send(
    &app,
    json_request(
      "POST",
      &format!("/students/{id}/email"),
      json!({ "subject": "Hello", "body": "Hi ida," }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(log["status"], "sent");
  assert_eq!(transport.delivered().len(), 1);
}

#[tokio::test]
async fn student_email_delivery_failure_is_soft() {
  let (app, _, transport) = app().await;
  transport.fail_with("connection refused");
  let id = create_student(&app, "joy").await;

  let (status, log) = send(
    &app,
    json_request(
      "POST",
      &format!("/students/{id}/email"),
      json!({ "subject": "Hello", "body": "Hi," }),
    ),
  )
  .await;
  // Recorded, not raised.
  assert_eq!(status, StatusCode::OK);
  assert_eq!(log["status"], "failed");
  assert_eq!(log["error_message"], "connection refused");
}

#[tokio::test]
async fn student_email_requires_address() {
  let (app, _, _) = app().await;
  let (_, body) = send(
    &app,
    json_request("POST", "/students", json!({ "first_name": "kim" })),
  )
  .await;
  let id = body["id"].as_i64().unwrap();

  let (status, _) = send(
    &app,
    json_request(
      "POST",
      &format!("/students/{id}/email"),
      json!({ "subject": "s", "body": "b" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Leads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn leads_listing_and_processed_flag() {
  let (app, _, _) = app().await;
  send(
    &app,
    json_request("POST", "/webhooks/leads", json!({ "email": "a@example.com" })),
  )
  .await;
  let (_, body) = send(&app, get_request("/leads")).await;
  assert_eq!(body["total"], 1);
  let lead_id = body["items"][0]["id"].as_i64().unwrap();
  assert_eq!(body["items"][0]["processed"], false);

  let (status, _) = send(
    &app,
    json_request("POST", &format!("/leads/{lead_id}/processed"), json!({})),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, body) = send(&app, get_request("/leads")).await;
  assert_eq!(body["items"][0]["processed"], true);
}

// ─── Staff ───────────────────────────────────────────────────────────────────

async fn create_staff(app: &Router, username: &str, role: &str) -> i64 {
  let (status, body) = send(
    app,
    json_request(
      "POST",
      "/staff",
      json!({ "username": username, "role": role }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["id"].as_i64().unwrap()
}

fn delete_staff_request(id: i64, actor: Option<i64>) -> Request<Body> {
  let mut builder = Request::builder()
    .method("DELETE")
    .uri(format!("/staff/{id}"));
  if let Some(actor) = actor {
    builder = builder.header("X-Actor-Id", actor.to_string());
  }
  builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn staff_deletion_is_admin_gated() {
  let (app, _, _) = app().await;
  let admin = create_staff(&app, "root", "admin").await;
  let other_admin = create_staff(&app, "root2", "admin").await;
  let manager = create_staff(&app, "mgr", "manager").await;
  let plain = create_staff(&app, "plain", "staff").await;

  // Non-admin actor.
  let (status, _) = send(&app, delete_staff_request(plain, Some(manager))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  // Admin accounts are protected.
  let (status, _) = send(&app, delete_staff_request(other_admin, Some(admin))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  // Self-deletion (also hits the admin protection, same outcome).
  let (status, _) = send(&app, delete_staff_request(admin, Some(admin))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  // Missing header.
  let (status, _) = send(&app, delete_staff_request(plain, None)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  // Admin deleting a regular account works.
  let (status, _) = send(&app, delete_staff_request(plain, Some(admin))).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, body) = send(&app, get_request("/staff")).await;
  assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn staff_listing_filters() {
  let (app, _, _) = app().await;
  create_staff(&app, "root", "admin").await;
  create_staff(&app, "mgr", "manager").await;

  let (_, body) = send(&app, get_request("/staff?role=manager")).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["username"], "mgr");

  let (_, body) = send(&app, get_request("/staff?status=active")).await;
  assert_eq!(body.as_array().unwrap().len(), 2);
}

// ─── Email ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn broadcast_endpoint_personalizes() {
  let (app, _, transport) = app().await;
  create_student(&app, "Lia").await;
  create_student(&app, "Max").await;

  let (status, report) = send(
    &app,
    json_request(
      "POST",
      "/email/broadcast",
      json!({
        "audience": "all",
        "subject": "Intake",
        "body": "Hi {{ first_name }}!",
      }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["sent"], 2);
  assert_eq!(report["total"], 2);

  let delivered = transport.delivered();
  assert!(delivered.iter().any(|m| m.body == "Hi Lia!"));

  let (_, logs) = send(&app, get_request("/email/log")).await;
  assert_eq!(logs.as_array().unwrap().len(), 2);
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_endpoint_shape() {
  let (app, _, _) = app().await;
  create_student(&app, "Nia").await;
  send(
    &app,
    json_request("POST", "/webhooks/leads", json!({ "email": "x@example.com" })),
  )
  .await;

  let (status, body) = send(&app, get_request("/stats")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total_students"], 2);
  assert_eq!(body["total_leads"], 1);
  assert!(body["countries"].is_array());
  assert!(body["lead_counts"].is_array());
}
