//! Handlers for `/email` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/email/broadcast` | Audience selector + subject + body |
//! | `GET`  | `/email/log` | Most recent 30 log rows |

use axum::{Json, extract::State};
use matric_core::{email::{Audience, EmailLog}, store::CrmStore};
use matric_mailer::{MailTransport, SendReport};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// Log rows shown on the email dashboard.
const LOG_LIMIT: usize = 30;

#[derive(Debug, Deserialize)]
pub struct BroadcastBody {
  #[serde(flatten)]
  pub audience: Audience,
  pub subject:  String,
  pub body:     String,
}

/// `POST /email/broadcast` — body e.g.
/// `{"audience":"course","course":"IELTS","subject":...,"body":...}`.
/// Bodies may use `{{ first_name }}` for per-recipient substitution.
pub async fn broadcast<S, T>(
  State(state): State<AppState<S, T>>,
  Json(body): Json<BroadcastBody>,
) -> Result<Json<SendReport>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let report = state
    .mailer
    .broadcast(&body.audience, &body.subject, &body.body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}

/// `GET /email/log`
pub async fn log<S, T>(
  State(state): State<AppState<S, T>>,
) -> Result<Json<Vec<EmailLog>>, ApiError>
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport,
{
  let logs = state
    .store
    .recent_email_logs(LOG_LIMIT)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(logs))
}
