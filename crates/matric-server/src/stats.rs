//! `GET /stats` — dashboard aggregates.

use axum::{Json, extract::State};
use matric_core::store::{CrmStore, DashboardStats};
use matric_mailer::MailTransport;

use crate::{AppState, error::ApiError};

/// `GET /stats`
pub async fn dashboard<S, T>(
  State(state): State<AppState<S, T>>,
) -> Result<Json<DashboardStats>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let stats = state
    .store
    .dashboard_stats()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stats))
}
