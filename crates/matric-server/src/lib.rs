//! HTTP surface for the Matric admissions CRM.
//!
//! Exposes an axum [`Router`] backed by any [`matric_core::store::CrmStore`]
//! and any [`matric_mailer::MailTransport`]. Session auth and TLS are the
//! deployment's responsibility; the only identity the API reads is the
//! optional `X-Actor-Id` header naming the acting staff user.

pub mod applications;
pub mod email;
pub mod error;
pub mod leads;
pub mod staff;
pub mod stats;
pub mod students;
pub mod webhook;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use matric_core::{store::CrmStore, student::StatusPolicy};
use matric_intake::{AssignmentPolicy, FirstActive, Intake, RoundRobin};
use matric_mailer::{MailTransport, Mailer};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `MATRIC_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Which application-status transitions the status endpoint accepts.
  #[serde(default)]
  pub status_policy: StatusPolicy,
  #[serde(default)]
  pub assignment:    Assignment,
  pub smtp:          SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
  pub host:       String,
  #[serde(default = "default_smtp_port")]
  pub port:       u16,
  #[serde(default)]
  pub username:   String,
  #[serde(default)]
  pub password:   String,
  pub from_email: String,
}

/// Configured counselor-assignment strategy for incoming leads.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
  #[default]
  FirstActive,
  RoundRobin,
}

impl Assignment {
  pub fn policy(self) -> Box<dyn AssignmentPolicy> {
    match self {
      Assignment::FirstActive => Box::new(FirstActive),
      Assignment::RoundRobin => Box::new(RoundRobin::new()),
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8000 }
fn default_smtp_port() -> u16 { 587 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, T> {
  pub store:         Arc<S>,
  pub intake:        Arc<Intake<S, Box<dyn AssignmentPolicy>>>,
  pub mailer:        Arc<Mailer<S, T>>,
  pub status_policy: StatusPolicy,
}

impl<S: CrmStore + Clone, T: MailTransport> AppState<S, T> {
  pub fn new(
    store: S,
    transport: T,
    from_email: impl Into<String>,
    status_policy: StatusPolicy,
    assignment: Box<dyn AssignmentPolicy>,
  ) -> Self {
    Self {
      intake: Arc::new(Intake::with_policy(store.clone(), assignment)),
      mailer: Arc::new(Mailer::new(store.clone(), transport, from_email)),
      store: Arc::new(store),
      status_policy,
    }
  }
}

impl<S, T> Clone for AppState<S, T> {
  fn clone(&self) -> Self {
    Self {
      store:         self.store.clone(),
      intake:        self.intake.clone(),
      mailer:        self.mailer.clone(),
      status_policy: self.status_policy,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
pub fn router<S, T>(state: AppState<S, T>) -> Router
where
  S: CrmStore + Clone + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: MailTransport + 'static,
{
  Router::new()
    // Lead intake
    .route("/webhooks/leads", post(webhook::receive::<S, T>))
    // Applications
    .route("/applications", get(applications::list::<S, T>))
    .route("/applications/status", post(applications::update_status::<S, T>))
    // Students
    .route(
      "/students",
      get(students::list::<S, T>).post(students::create::<S, T>),
    )
    .route(
      "/students/{id}",
      get(students::get_one::<S, T>)
        .put(students::update::<S, T>)
        .delete(students::delete::<S, T>),
    )
    .route("/students/{id}/archive", post(students::archive::<S, T>))
    .route("/students/{id}/documents", post(students::add_document::<S, T>))
    .route("/students/{id}/email", post(students::send_email::<S, T>))
    // Leads
    .route("/leads", get(leads::list::<S, T>))
    .route("/leads/{id}/processed", post(leads::mark_processed::<S, T>))
    // Staff
    .route("/staff", get(staff::list::<S, T>).post(staff::create::<S, T>))
    .route("/staff/{id}", delete(staff::delete::<S, T>))
    // Email
    .route("/email/broadcast", post(email::broadcast::<S, T>))
    .route("/email/log", get(email::log::<S, T>))
    // Aggregates
    .route("/stats", get(stats::dashboard::<S, T>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
