//! Uploaded student documents.
//!
//! Only the file reference is stored here; the bytes live wherever the
//! deployment keeps its upload directory. Documents are cascade-deleted with
//! their student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDocument {
  pub id:          i64,
  pub student_id:  i64,
  pub title:       String,
  /// Relative path under the upload directory, e.g.
  /// `student_documents/2026/08/transcript.pdf`.
  pub file_path:   String,
  pub note:        String,
  pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
  pub student_id: i64,
  pub title:      String,
  /// Bare file name; the store assigns the dated subdirectory.
  pub file_name:  String,
  pub note:       String,
}
