//! Lead — one raw inbound contact/interest event.
//!
//! The original submission payload is kept verbatim for audit and replay.
//! A lead row is immutable once created except for its `processed` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag attached to students created by intake.
pub const LEAD_SOURCE_TAG: &str = "Facebook Lead";

/// Placeholder name parts used when the payload carries no name at all.
pub const PLACEHOLDER_FIRST_NAME: &str = "Facebook";
pub const PLACEHOLDER_LAST_NAME: &str = "Lead";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
  Facebook,
  Manual,
  #[default]
  Other,
}

/// Campaign metadata extracted from the nested `facebook` payload object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignInfo {
  #[serde(default, alias = "lead_id")]
  pub external_lead_id: String,
  #[serde(default)]
  pub campaign_name:    String,
  #[serde(default)]
  pub adset_name:       String,
  #[serde(default)]
  pub ad_name:          String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
  pub id:          i64,
  pub source:      LeadSource,
  /// The inbound JSON body, stored verbatim.
  pub payload:     serde_json::Value,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  /// Resolved directory record; nulled (not cascaded) if the student is
  /// deleted.
  pub student_id:  Option<i64>,
  pub campaign:    CampaignInfo,
  pub processed:   bool,
  /// Counselor-of-record; nulled if that user is removed.
  pub assigned_to: Option<i64>,
  pub created_at:  DateTime<Utc>,
}

/// Everything the store needs to persist one intake atomically: the parsed
/// contact fields, the verbatim payload, and the chosen assignee.
#[derive(Debug, Clone)]
pub struct LeadDraft {
  pub source:      LeadSource,
  pub phone:       Option<String>,
  pub email:       Option<String>,
  pub first_name:  String,
  pub last_name:   String,
  pub course:      Option<String>,
  pub country:     Option<String>,
  pub campaign:    CampaignInfo,
  pub payload:     serde_json::Value,
  pub assigned_to: Option<i64>,
}

/// Result of one intake: which lead row was written, which student it
/// resolved to, and whether that student was created by this call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IntakeOutcome {
  pub lead_id:     i64,
  pub student_id:  i64,
  pub new_student: bool,
}
