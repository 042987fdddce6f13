//! Reference data: countries and tags.
//!
//! Both are resolved-or-created by exact name match during lead intake.
//! Deleting a country nulls the student reference; deleting a tag removes
//! only the association.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
  pub id:   i64,
  pub name: String,
}
