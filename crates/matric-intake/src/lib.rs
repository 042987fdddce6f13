//! Lead intake orchestration.
//!
//! Turns a raw webhook body into one atomic store transaction: parse the
//! recognised fields, pick a counselor, and hand the draft to
//! [`CrmStore::ingest_lead`]. Everything after parsing either commits as a
//! whole or not at all.

use matric_core::{lead::IntakeOutcome, store::CrmStore};
use thiserror::Error;

pub mod assign;
pub mod payload;

pub use assign::{AssignmentPolicy, FirstActive, RoundRobin};
pub use payload::LeadPayload;

#[derive(Debug, Error)]
pub enum IntakeError<E> {
  /// The body was not a JSON object we can read fields from. Rejected
  /// before any write.
  #[error("invalid payload: {0}")]
  Payload(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(E),
}

/// The intake pipeline: a store plus an assignment policy.
pub struct Intake<S, P = FirstActive> {
  store:  S,
  policy: P,
}

impl<S: CrmStore> Intake<S> {
  /// Intake with the default first-active assignment.
  pub fn new(store: S) -> Self {
    Self { store, policy: FirstActive }
  }
}

impl<S: CrmStore, P: AssignmentPolicy> Intake<S, P> {
  pub fn with_policy(store: S, policy: P) -> Self {
    Self { store, policy }
  }

  /// Process one inbound submission.
  ///
  /// Re-submitting an identical body creates a second lead row; only the
  /// student is deduplicated.
  pub async fn process(
    &self,
    body: serde_json::Value,
  ) -> Result<IntakeOutcome, IntakeError<S::Error>> {
    let payload: LeadPayload = serde_json::from_value(body.clone())?;

    let counselors = self
      .store
      .active_counselors()
      .await
      .map_err(IntakeError::Store)?;
    let assigned_to = self.policy.pick(&counselors);

    let draft = payload.into_draft(body, assigned_to);
    let outcome = self
      .store
      .ingest_lead(draft)
      .await
      .map_err(IntakeError::Store)?;

    tracing::info!(
      lead_id = outcome.lead_id,
      student_id = outcome.student_id,
      new_student = outcome.new_student,
      ?assigned_to,
      "lead ingested"
    );
    Ok(outcome)
  }
}
