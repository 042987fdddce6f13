//! Student — the primary directory record.
//!
//! A student is created either by a staff form submission or by lead intake.
//! Normal-flow removal is archival (a flag), not deletion.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
  Other,
}

/// Where a student's application sits. A flat enum; whether transitions are
/// restricted is decided by [`StatusPolicy`], not by the type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
  #[default]
  Pending,
  UnderReview,
  Approved,
  Rejected,
}

// ─── Transition policy ───────────────────────────────────────────────────────

/// Governs which application-status transitions `set_application_status`
/// accepts. The original system allowed any state to move to any other;
/// `Unrestricted` preserves that and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
  #[default]
  Unrestricted,
  /// Forward-only pipeline: pending → under_review → approved | rejected.
  /// Writing the current state back is always permitted.
  Pipeline,
}

impl StatusPolicy {
  pub fn permits(self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    match self {
      StatusPolicy::Unrestricted => true,
      StatusPolicy::Pipeline => {
        from == to
          || matches!(
            (from, to),
            (Pending, UnderReview) | (UnderReview, Approved) | (UnderReview, Rejected)
          )
      }
    }
  }
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// A prospective or enrolled student.
///
/// `phone` and `email` are plain strings with no uniqueness or normalisation
/// guarantees; lead intake matches them by exact comparison only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub id:                 i64,
  pub first_name:         String,
  pub last_name:          String,
  pub gender:             Option<Gender>,
  pub age:                Option<u32>,
  pub country_id:         Option<i64>,
  pub enrollment_date:    Option<NaiveDate>,
  pub phone:              String,
  pub email:              String,
  pub passport_number:    Option<String>,
  pub visa_type:          Option<String>,
  pub visa_expiry:        Option<NaiveDate>,
  pub course:             Option<String>,
  pub application_status: ApplicationStatus,
  pub notes:              String,
  pub consent_given:      bool,
  /// Set exactly once, the first time `consent_given` transitions to true.
  /// Never cleared or overwritten afterwards.
  pub consent_timestamp:  Option<DateTime<Utc>>,
  /// Staff user who created the record; nulled if that user is removed.
  pub created_by:         Option<i64>,
  pub archived:           bool,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

/// Field set accepted by both the create and the edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
  pub first_name:         String,
  #[serde(default)]
  pub last_name:          String,
  pub gender:             Option<Gender>,
  pub age:                Option<u32>,
  pub country_id:         Option<i64>,
  pub enrollment_date:    Option<NaiveDate>,
  #[serde(default)]
  pub phone:              String,
  #[serde(default)]
  pub email:              String,
  pub passport_number:    Option<String>,
  pub visa_type:          Option<String>,
  pub visa_expiry:        Option<NaiveDate>,
  pub course:             Option<String>,
  #[serde(default)]
  pub application_status: ApplicationStatus,
  #[serde(default)]
  pub notes:              String,
  #[serde(default)]
  pub consent_given:      bool,
  pub created_by:         Option<i64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unrestricted_permits_everything() {
    use ApplicationStatus::*;
    let p = StatusPolicy::Unrestricted;
    for from in [Pending, UnderReview, Approved, Rejected] {
      for to in [Pending, UnderReview, Approved, Rejected] {
        assert!(p.permits(from, to));
      }
    }
  }

  #[test]
  fn pipeline_blocks_backwards_moves() {
    use ApplicationStatus::*;
    let p = StatusPolicy::Pipeline;
    assert!(p.permits(Pending, UnderReview));
    assert!(p.permits(UnderReview, Approved));
    assert!(p.permits(UnderReview, Rejected));
    assert!(p.permits(Approved, Approved));
    assert!(!p.permits(Approved, Pending));
    assert!(!p.permits(Pending, Approved));
    assert!(!p.permits(Rejected, UnderReview));
  }
}
