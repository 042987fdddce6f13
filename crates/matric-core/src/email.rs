//! Outbound email records and broadcast audience selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::student::ApplicationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
  Sent,
  Failed,
}

/// Write-once record of one outbound message attempt. Broadcasts write one
/// row per recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
  pub id:            i64,
  pub student_id:    Option<i64>,
  pub lead_id:       Option<i64>,
  pub to_email:      String,
  pub from_email:    String,
  pub subject:       String,
  pub body:          String,
  pub status:        EmailStatus,
  pub error_message: String,
  pub sent_at:       DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
  pub student_id:    Option<i64>,
  pub lead_id:       Option<i64>,
  pub to_email:      String,
  pub from_email:    String,
  pub subject:       String,
  pub body:          String,
  pub status:        EmailStatus,
  pub error_message: String,
}

/// Which non-archived students (with a non-empty email) a broadcast reaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "audience", rename_all = "lowercase")]
pub enum Audience {
  All,
  /// Case-insensitive substring match over the course field.
  Course { course: String },
  Country { country_id: i64 },
  Status { status: ApplicationStatus },
}
