//! Handlers for `/leads` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/leads` | `?page=`, 25/page, newest first |
//! | `POST` | `/leads/{id}/processed` | Marks the lead handled |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use matric_core::{
  lead::Lead,
  store::{CrmStore, Page},
};
use matric_mailer::MailTransport;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub page: usize,
}

/// `GET /leads`
pub async fn list<S, T>(
  State(state): State<AppState<S, T>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Lead>>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let page = state
    .store
    .list_leads(params.page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `POST /leads/{id}/processed`
pub async fn mark_processed<S, T>(
  State(state): State<AppState<S, T>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  state
    .store
    .get_lead(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lead {id} not found")))?;

  state
    .store
    .mark_lead_processed(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
