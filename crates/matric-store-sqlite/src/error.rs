//! Error type for `matric-store-sqlite`.

use matric_core::student::ApplicationStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column held a value outside the closed variant set.
  #[error("unknown stored value: {0}")]
  Decode(String),

  #[error("{0} {1} not found")]
  NotFound(&'static str, i64),

  /// The configured status policy rejected the transition.
  #[error("status transition {from:?} -> {to:?} is not permitted")]
  StatusNotAllowed {
    from: ApplicationStatus,
    to:   ApplicationStatus,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
