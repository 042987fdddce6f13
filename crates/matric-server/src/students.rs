//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students` | `?q=&country=&tag=&archived=&page=`, 12/page |
//! | `POST`   | `/students` | Body: [`NewStudent`] |
//! | `GET`    | `/students/{id}` | Detail with tags, documents, activity |
//! | `PUT`    | `/students/{id}` | Replaces form-editable fields |
//! | `DELETE` | `/students/{id}` | Hard delete; archive is the normal flow |
//! | `POST`   | `/students/{id}/archive` | Soft delete |
//! | `POST`   | `/students/{id}/documents` | Upload metadata |
//! | `POST`   | `/students/{id}/email` | Single send, logged |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use matric_core::{
  activity::{ActivityLog, NewActivity},
  directory::Tag,
  document::{NewDocument, StudentDocument},
  email::EmailLog,
  store::{CrmStore, Page, StudentQuery},
  student::{NewStudent, Student},
};
use matric_mailer::MailTransport;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::ApiError};

/// Activity rows shown on the detail view.
const DETAIL_ACTIVITY_LIMIT: usize = 20;

/// Read the acting staff user from the `X-Actor-Id` header, if present.
pub(crate) fn actor_id(headers: &HeaderMap) -> Option<i64> {
  headers
    .get("x-actor-id")
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.parse().ok())
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub q:        Option<String>,
  pub country:  Option<i64>,
  pub tag:      Option<i64>,
  pub archived: Option<bool>,
  #[serde(default)]
  pub page:     usize,
}

/// `GET /students`
pub async fn list<S, T>(
  State(state): State<AppState<S, T>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Student>>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let query = StudentQuery {
    text: params.q,
    country_id: params.country,
    tag_id: params.tag,
    archived: params.archived,
    page: params.page,
    ..Default::default()
  };
  let page = state
    .store
    .search_students(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Create / update ─────────────────────────────────────────────────────────

/// `POST /students`
pub async fn create<S, T>(
  State(state): State<AppState<S, T>>,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let student = state
    .store
    .create_student(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `PUT /students/{id}`
pub async fn update<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
  Json(body): Json<NewStudent>,
) -> Result<Json<Student>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  ensure_student(&state, id).await?;
  let student = state
    .store
    .update_student(id, body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(student))
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StudentDetail {
  pub student:   Student,
  pub tags:      Vec<Tag>,
  pub documents: Vec<StudentDocument>,
  pub activity:  Vec<ActivityLog>,
}

/// `GET /students/{id}`
pub async fn get_one<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
) -> Result<Json<StudentDetail>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let student = ensure_student(&state, id).await?;
  let tags = state.store.student_tags(id).await.map_err(ApiError::store)?;
  let documents = state
    .store
    .list_documents(id)
    .await
    .map_err(ApiError::store)?;
  let activity = state
    .store
    .student_activity(id, DETAIL_ACTIVITY_LIMIT)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(StudentDetail { student, tags, documents, activity }))
}

// ─── Archive / delete ────────────────────────────────────────────────────────

/// `POST /students/{id}/archive`
pub async fn archive<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  ensure_student(&state, id).await?;
  state
    .store
    .archive_student(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /students/{id}`
pub async fn delete<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  ensure_student(&state, id).await?;
  state
    .store
    .delete_student(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DocumentBody {
  #[serde(default)]
  pub title:     String,
  pub file_name: String,
  #[serde(default)]
  pub note:      String,
}

/// `POST /students/{id}/documents`
pub async fn add_document<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
  headers: HeaderMap,
  Json(body): Json<DocumentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  ensure_student(&state, id).await?;

  let document = state
    .store
    .add_document(NewDocument {
      student_id: id,
      title:      body.title,
      file_name:  body.file_name,
      note:       body.note,
    })
    .await
    .map_err(ApiError::store)?;

  state
    .store
    .log_activity(NewActivity {
      actor_id:   actor_id(&headers),
      student_id: Some(id),
      action:     "uploaded_document".to_owned(),
      data:       Some(json!({ "document_id": document.id })),
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(document)))
}

// ─── Email ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmailBody {
  pub subject: String,
  pub body:    String,
}

/// `POST /students/{id}/email` — delivery failure is recorded on the
/// returned log row, never a 5xx.
pub async fn send_email<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
  Json(body): Json<EmailBody>,
) -> Result<Json<EmailLog>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let student = ensure_student(&state, id).await?;
  if student.email.is_empty() {
    return Err(ApiError::BadRequest(
      "student has no email address".to_owned(),
    ));
  }

  let log = state
    .mailer
    .send_to_student(&student, &body.subject, &body.body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(log))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn ensure_student<S, T>(
  state: &AppState<S, T>,
  id: i64,
) -> Result<Student, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  state
    .store
    .get_student(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))
}
