//! In-memory transport for tests.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use crate::{MailTransport, OutboundEmail, TransportError};

#[derive(Default)]
struct Inner {
  delivered:  Vec<OutboundEmail>,
  failure:    Option<String>,
  recipients: HashMap<String, String>,
}

/// Records every delivered message instead of sending it. Delivery can be
/// made to fail globally or for individual recipients to exercise the
/// failure-logging paths.
#[derive(Clone, Default)]
pub struct BufferTransport {
  inner: Arc<Mutex<Inner>>,
}

impl BufferTransport {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent delivery fail with `message`.
  pub fn fail_with(&self, message: &str) {
    self.inner.lock().unwrap().failure = Some(message.to_owned());
  }

  /// Make deliveries to one address fail with `message`.
  pub fn fail_recipient(&self, to: &str, message: &str) {
    self
      .inner
      .lock()
      .unwrap()
      .recipients
      .insert(to.to_owned(), message.to_owned());
  }

  /// Resume successful delivery everywhere.
  pub fn recover(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.failure = None;
    inner.recipients.clear();
  }

  pub fn delivered(&self) -> Vec<OutboundEmail> {
    self.inner.lock().unwrap().delivered.clone()
  }
}

impl MailTransport for BufferTransport {
  async fn deliver(&self, mail: &OutboundEmail) -> Result<(), TransportError> {
    let mut inner = self.inner.lock().unwrap();
    if let Some(message) = &inner.failure {
      return Err(TransportError::new(message));
    }
    if let Some(message) = inner.recipients.get(&mail.to) {
      return Err(TransportError::new(message));
    }
    inner.delivered.push(mail.clone());
    Ok(())
  }
}
