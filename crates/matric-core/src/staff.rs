//! Staff accounts.
//!
//! Authentication and sessions live outside this system; staff rows exist so
//! leads and students can reference their owners and so intake can pick a
//! counselor-of-record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
  Admin,
  Manager,
  Staff,
}

impl StaffRole {
  /// Only admins may delete accounts, and admin accounts are protected.
  pub fn can_manage_accounts(self) -> bool { matches!(self, StaffRole::Admin) }

  /// Roles eligible for lead assignment.
  pub fn is_counselor_role(self) -> bool {
    matches!(self, StaffRole::Admin | StaffRole::Manager)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUser {
  pub id:         i64,
  pub username:   String,
  pub first_name: String,
  pub last_name:  String,
  pub email:      String,
  pub role:       StaffRole,
  pub active:     bool,
  pub created_at: DateTime<Utc>,
}

impl StaffUser {
  pub fn is_eligible_counselor(&self) -> bool {
    self.active && self.role.is_counselor_role()
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
  pub username:   String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name:  String,
  #[serde(default)]
  pub email:      String,
  pub role:       StaffRole,
  #[serde(default = "default_active")]
  pub active:     bool,
}

fn default_active() -> bool { true }
