//! Inbound webhook payload parsing.
//!
//! Payloads arrive from forwarding services (Zapier, Make, Facebook's own
//! delivery) with inconsistent field names, so several fields accept an
//! alternate spelling. Unknown fields are ignored; the verbatim body is kept
//! on the lead row regardless of what parses here.

use matric_core::lead::{CampaignInfo, LeadDraft, LeadSource};
use serde::Deserialize;

/// The recognised subset of an inbound lead submission.
///
/// `phone`/`phone_number` and `course`/`interested_course` are separate
/// fields rather than serde aliases so a payload carrying both spellings is
/// accepted (the primary one wins) instead of rejected as a duplicate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadPayload {
  #[serde(default)]
  pub source:            Option<String>,
  #[serde(default)]
  pub phone:             Option<String>,
  #[serde(default)]
  pub phone_number:      Option<String>,
  #[serde(default)]
  pub email:             Option<String>,
  #[serde(default)]
  pub full_name:         Option<String>,
  #[serde(default)]
  pub first_name:        Option<String>,
  #[serde(default)]
  pub last_name:         Option<String>,
  #[serde(default)]
  pub course:            Option<String>,
  #[serde(default)]
  pub interested_course: Option<String>,
  #[serde(default)]
  pub country:           Option<String>,
  /// Nested campaign metadata from the Facebook lead form.
  #[serde(default)]
  pub facebook:          CampaignInfo,
}

impl LeadPayload {
  /// Resolve the name fields. Explicit `first_name` wins; otherwise
  /// `full_name` is split once on the first space, and a single-word name
  /// leaves the last name empty.
  fn name_parts(&self) -> (String, String) {
    let mut first = self.first_name.clone().unwrap_or_default();
    let mut last = self.last_name.clone().unwrap_or_default();
    if first.is_empty() {
      if let Some(full) = self.full_name.as_deref() {
        match full.trim().split_once(' ') {
          Some((f, l)) => {
            first = f.to_owned();
            last = l.to_owned();
          }
          None => first = full.trim().to_owned(),
        }
      }
    }
    (first, last)
  }

  fn source(&self) -> LeadSource {
    match self.source.as_deref() {
      // Absent or empty means the default channel.
      None | Some("") | Some("facebook") => LeadSource::Facebook,
      Some("manual") => LeadSource::Manual,
      Some(_) => LeadSource::Other,
    }
  }

  /// Build the store draft. `body` is the verbatim inbound JSON, kept for
  /// audit; `assigned_to` is the counselor chosen by the assignment policy.
  pub fn into_draft(
    self,
    body: serde_json::Value,
    assigned_to: Option<i64>,
  ) -> LeadDraft {
    let (first_name, last_name) = self.name_parts();
    let source = self.source();

    LeadDraft {
      source,
      phone: self
        .phone
        .or(self.phone_number)
        .filter(|p| !p.is_empty()),
      email: self.email.filter(|e| !e.is_empty()),
      first_name,
      last_name,
      course: self
        .course
        .or(self.interested_course)
        .filter(|c| !c.is_empty()),
      country: self.country.filter(|c| !c.is_empty()),
      campaign: self.facebook,
      payload: body,
      assigned_to,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(v: serde_json::Value) -> LeadPayload {
    serde_json::from_value(v).expect("payload parses")
  }

  #[test]
  fn full_name_splits_on_first_space() {
    let p = parse(serde_json::json!({ "full_name": "Ali Khan Junior" }));
    assert_eq!(p.name_parts(), ("Ali".to_owned(), "Khan Junior".to_owned()));
  }

  #[test]
  fn single_word_full_name_leaves_last_empty() {
    let p = parse(serde_json::json!({ "full_name": "Ali" }));
    assert_eq!(p.name_parts(), ("Ali".to_owned(), String::new()));
  }

  #[test]
  fn explicit_first_name_wins_over_full_name() {
    let p = parse(serde_json::json!({
      "full_name": "Wrong Person",
      "first_name": "Ali",
      "last_name": "Khan",
    }));
    assert_eq!(p.name_parts(), ("Ali".to_owned(), "Khan".to_owned()));
  }

  #[test]
  fn alternate_field_spellings_accepted() {
    let p = parse(serde_json::json!({
      "phone_number": "+923001234567",
      "interested_course": "Computer Science",
    }));
    let draft = p.into_draft(serde_json::json!({}), None);
    assert_eq!(draft.phone.as_deref(), Some("+923001234567"));
    assert_eq!(draft.course.as_deref(), Some("Computer Science"));
  }

  #[test]
  fn primary_spelling_wins_when_both_present() {
    let p = parse(serde_json::json!({
      "phone": "111",
      "phone_number": "222",
    }));
    let draft = p.into_draft(serde_json::json!({}), None);
    assert_eq!(draft.phone.as_deref(), Some("111"));
  }

  #[test]
  fn source_defaults_to_facebook() {
    assert_eq!(parse(serde_json::json!({})).source(), LeadSource::Facebook);
    assert_eq!(
      parse(serde_json::json!({ "source": "manual" })).source(),
      LeadSource::Manual
    );
    assert_eq!(
      parse(serde_json::json!({ "source": "walk-in" })).source(),
      LeadSource::Other
    );
  }

  #[test]
  fn nested_campaign_metadata() {
    let p = parse(serde_json::json!({
      "facebook": {
        "lead_id": "1234567890",
        "campaign_name": "Sep Intake 2025",
        "adset_name": "Pakistan - CS",
        "ad_name": "Main Lead Form Ad",
      }
    }));
    assert_eq!(p.facebook.external_lead_id, "1234567890");
    assert_eq!(p.facebook.campaign_name, "Sep Intake 2025");
  }

  #[test]
  fn empty_strings_become_none() {
    let p = parse(serde_json::json!({ "phone": "", "email": "", "country": "" }));
    let draft = p.into_draft(serde_json::json!({}), None);
    assert!(draft.phone.is_none());
    assert!(draft.email.is_none());
    assert!(draft.country.is_none());
  }
}
