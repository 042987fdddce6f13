//! Handlers for the applications pipeline view.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications` | `?q=&status=&country=&page=` + per-status counts |
//! | `POST` | `/applications/status` | form-encoded `id`, `status` |

use axum::{
  Json,
  extract::{Form, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use matric_core::{
  store::{ApplicationStats, CrmStore, Page, StudentQuery},
  student::{ApplicationStatus, StatusPolicy, Student},
};
use matric_mailer::MailTransport;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub q:       Option<String>,
  pub status:  Option<ApplicationStatus>,
  pub country: Option<i64>,
  #[serde(default)]
  pub page:    usize,
}

/// The listing plus the counts shown above it. Counts are always over the
/// full (unfiltered) set.
#[derive(Debug, Serialize)]
pub struct ApplicationsView {
  pub applications: Page<Student>,
  pub stats:        ApplicationStats,
}

/// `GET /applications`
pub async fn list<S, T>(
  State(state): State<AppState<S, T>>,
  Query(params): Query<ListParams>,
) -> Result<Json<ApplicationsView>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let query = StudentQuery {
    text: params.q,
    status: params.status,
    country_id: params.country,
    page: params.page,
    ..Default::default()
  };

  let applications = state
    .store
    .search_students(&query)
    .await
    .map_err(ApiError::store)?;
  let stats = state
    .store
    .application_stats()
    .await
    .map_err(ApiError::store)?;

  Ok(Json(ApplicationsView { applications, stats }))
}

// ─── Status update ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusForm {
  pub id:     i64,
  pub status: String,
}

/// `POST /applications/status` — form-encoded, with its own response shape:
/// `{"success": true, "status": ...}` or `{"success": false, "error": ...}`.
pub async fn update_status<S, T>(
  State(state): State<AppState<S, T>>,
  Form(form): Form<StatusForm>,
) -> Response
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let Ok(status) = serde_json::from_value::<ApplicationStatus>(json!(form.status))
  else {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({ "success": false, "error": "Invalid status" })),
    )
      .into_response();
  };

  let student = match state.store.get_student(form.id).await {
    Ok(Some(student)) => student,
    Ok(None) => {
      return (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Not found" })),
      )
        .into_response();
    }
    Err(e) => return ApiError::store(e).into_response(),
  };

  // The transition rule is checked here against the configured policy; the
  // store call below is then unconditional.
  if !state.status_policy.permits(student.application_status, status) {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({ "success": false, "error": "Transition not allowed" })),
    )
      .into_response();
  }

  if let Err(e) = state
    .store
    .set_application_status(form.id, status, StatusPolicy::Unrestricted)
    .await
  {
    return ApiError::store(e).into_response();
  }

  Json(json!({ "success": true, "status": form.status })).into_response()
}
