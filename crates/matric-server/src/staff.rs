//! Handlers for `/staff` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/staff` | `?q=&role=&status=active\|inactive` |
//! | `POST`   | `/staff` | Body: [`NewStaff`] |
//! | `DELETE` | `/staff/{id}` | Actor via `X-Actor-Id`; admin-gated |
//!
//! Deletion rules: only an admin may delete an account, admin accounts are
//! protected, and no one deletes themselves.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use matric_core::{
  staff::{NewStaff, StaffRole, StaffUser},
  store::{CrmStore, StaffQuery},
};
use matric_mailer::MailTransport;
use serde::Deserialize;

use crate::{AppState, error::ApiError, students::actor_id};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub q:      Option<String>,
  pub role:   Option<StaffRole>,
  /// `active` or `inactive`; anything else means no filter.
  pub status: Option<String>,
}

/// `GET /staff`
pub async fn list<S, T>(
  State(state): State<AppState<S, T>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<StaffUser>>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let active = match params.status.as_deref() {
    Some("active") => Some(true),
    Some("inactive") => Some(false),
    _ => None,
  };
  let query = StaffQuery { text: params.q, role: params.role, active };

  let users = state
    .store
    .list_staff(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(users))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /staff`
pub async fn create<S, T>(
  State(state): State<AppState<S, T>>,
  Json(body): Json<NewStaff>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let user = state.store.add_staff(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /staff/{id}`
pub async fn delete<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let actor_id = actor_id(&headers).ok_or_else(|| {
    ApiError::BadRequest("missing or invalid X-Actor-Id header".to_owned())
  })?;
  let actor = state
    .store
    .get_staff(actor_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Forbidden("unknown actor".to_owned()))?;

  if !actor.role.can_manage_accounts() {
    return Err(ApiError::Forbidden(
      "you do not have permission".to_owned(),
    ));
  }

  let target = state
    .store
    .get_staff(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("staff user {id} not found")))?;

  if target.role == StaffRole::Admin || target.id == actor.id {
    return Err(ApiError::Forbidden("cannot delete this account".to_owned()));
  }

  state
    .store
    .delete_staff(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
