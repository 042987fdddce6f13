//! Activity log — the append-only audit trail.
//!
//! Rows are never updated or deleted by the system; the only way one
//! disappears is the cascade when its student is hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
  pub id:         i64,
  /// Acting staff user; `None` means "system" (e.g. the lead webhook).
  pub actor_id:   Option<i64>,
  pub student_id: Option<i64>,
  /// Free-form action label, e.g. `"lead_created"` or `"uploaded_document"`.
  pub action:     String,
  pub data:       Option<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
  pub actor_id:   Option<i64>,
  pub student_id: Option<i64>,
  pub action:     String,
  pub data:       Option<serde_json::Value>,
}
