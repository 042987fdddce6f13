//! `POST /webhooks/leads` — the generic lead webhook.
//!
//! Accepts the JSON payloads that forwarding services (Zapier, Make,
//! Facebook) deliver. This endpoint has its own response shape, predating the
//! rest of the API: `{"status": "ok", ...}` / `{"status": "error", ...}`.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use matric_core::store::CrmStore;
use matric_intake::IntakeError;
use matric_mailer::MailTransport;
use serde_json::json;

use crate::AppState;

/// `POST /webhooks/leads`
pub async fn receive<S, T>(
  State(state): State<AppState<S, T>>,
  body: String,
) -> Response
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  // The body is parsed by hand so a malformed payload gets the documented
  // error shape instead of the extractor's default rejection.
  let value: serde_json::Value = match serde_json::from_str(&body) {
    Ok(v) => v,
    Err(_) => {
      return (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": "Invalid JSON" })),
      )
        .into_response();
    }
  };

  match state.intake.process(value).await {
    Ok(outcome) => Json(json!({
      "status":      "ok",
      "lead_id":     outcome.lead_id,
      "student_id":  outcome.student_id,
      "new_student": outcome.new_student,
    }))
    .into_response(),
    Err(IntakeError::Payload(e)) => (
      StatusCode::BAD_REQUEST,
      Json(json!({ "status": "error", "message": e.to_string() })),
    )
      .into_response(),
    Err(IntakeError::Store(e)) => {
      tracing::error!(error = %e, "lead intake failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": e.to_string() })),
      )
        .into_response()
    }
  }
}
