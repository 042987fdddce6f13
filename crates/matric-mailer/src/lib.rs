//! Outbound email: transport abstraction, SMTP implementation, and the
//! mailer that ties delivery to the write-once email log.
//!
//! Delivery failure is never a hard error. Each attempt writes exactly one
//! log row; a failed send records the error message and moves on.

use std::future::Future;

use matric_core::{
  email::{Audience, EmailLog, EmailStatus, NewEmailLog},
  store::CrmStore,
  student::Student,
};
use serde::Serialize;
use thiserror::Error;

mod buffer;
mod smtp;

pub use buffer::BufferTransport;
pub use smtp::SmtpMailer;

/// Placeholder replaced with the recipient's first name in broadcast bodies.
pub const FIRST_NAME_PLACEHOLDER: &str = "{{ first_name }}";

/// Delivery failure, flattened to the message that lands in the email log's
/// `error_message` column.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
  pub fn new(message: impl ToString) -> Self { Self(message.to_string()) }
}

/// One message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

/// Something that can deliver an email. Implemented by [`SmtpMailer`] for
/// real delivery and [`BufferTransport`] for tests.
pub trait MailTransport: Send + Sync {
  fn deliver(
    &self,
    mail: &OutboundEmail,
  ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Outcome of a broadcast: how many of the matched recipients were
/// successfully delivered to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SendReport {
  pub sent:  usize,
  pub total: usize,
}

// ─── Mailer ──────────────────────────────────────────────────────────────────

/// Sends mail through a [`MailTransport`] and records every attempt in the
/// store's email log.
pub struct Mailer<S, T> {
  store:      S,
  transport:  T,
  from_email: String,
}

impl<S: CrmStore, T: MailTransport> Mailer<S, T> {
  pub fn new(store: S, transport: T, from_email: impl Into<String>) -> Self {
    Self { store, transport, from_email: from_email.into() }
  }

  /// Send one message to one student.
  ///
  /// A transport failure is recorded on the returned log row, not raised;
  /// only a store failure is an error.
  pub async fn send_to_student(
    &self,
    student: &Student,
    subject: &str,
    body: &str,
  ) -> Result<EmailLog, S::Error> {
    let mail = OutboundEmail {
      to:      student.email.clone(),
      subject: subject.to_owned(),
      body:    body.to_owned(),
    };
    let (status, error_message) = self.attempt(&mail).await;

    self
      .store
      .append_email_log(NewEmailLog {
        student_id: Some(student.id),
        lead_id: None,
        to_email: mail.to,
        from_email: self.from_email.clone(),
        subject: mail.subject,
        body: mail.body,
        status,
        error_message,
      })
      .await
  }

  /// Send a personalised copy of `body` to every student the audience
  /// selector matches, one log row per recipient.
  pub async fn broadcast(
    &self,
    audience: &Audience,
    subject: &str,
    body: &str,
  ) -> Result<SendReport, S::Error> {
    let recipients = self.store.broadcast_audience(audience).await?;
    let total = recipients.len();
    let mut sent = 0;

    for student in &recipients {
      let personalized = body.replace(FIRST_NAME_PLACEHOLDER, &student.first_name);
      let mail = OutboundEmail {
        to:      student.email.clone(),
        subject: subject.to_owned(),
        body:    personalized,
      };
      let (status, error_message) = self.attempt(&mail).await;
      if status == EmailStatus::Sent {
        sent += 1;
      }

      self
        .store
        .append_email_log(NewEmailLog {
          student_id: Some(student.id),
          lead_id: None,
          to_email: mail.to,
          from_email: self.from_email.clone(),
          subject: mail.subject,
          body: mail.body,
          status,
          error_message,
        })
        .await?;
    }

    tracing::info!(sent, total, "broadcast finished");
    Ok(SendReport { sent, total })
  }

  async fn attempt(&self, mail: &OutboundEmail) -> (EmailStatus, String) {
    match self.transport.deliver(mail).await {
      Ok(()) => (EmailStatus::Sent, String::new()),
      Err(e) => {
        tracing::warn!(to = %mail.to, error = %e, "email delivery failed");
        (EmailStatus::Failed, e.to_string())
      }
    }
  }
}
