//! SMTP delivery via `lettre`.

use lettre::{
  message::{header::ContentType, Mailbox},
  transport::smtp::authentication::Credentials,
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{MailTransport, OutboundEmail, TransportError};

/// Plain-text SMTP transport. Relay, port, and credentials come from server
/// configuration.
#[derive(Clone)]
pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from:      Mailbox,
}

impl SmtpMailer {
  pub fn new(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
    from: &str,
  ) -> Result<Self, TransportError> {
    let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
      .map_err(TransportError::new)?
      .port(port)
      .credentials(Credentials::new(username.to_owned(), password.to_owned()))
      .build();
    let from = from.parse().map_err(TransportError::new)?;
    Ok(Self { transport, from })
  }
}

impl MailTransport for SmtpMailer {
  async fn deliver(&self, mail: &OutboundEmail) -> Result<(), TransportError> {
    let to: Mailbox = mail.to.parse().map_err(TransportError::new)?;
    let message = Message::builder()
      .from(self.from.clone())
      .to(to)
      .subject(mail.subject.clone())
      .header(ContentType::TEXT_PLAIN)
      .body(mail.body.clone())
      .map_err(TransportError::new)?;

    self
      .transport
      .send(message)
      .await
      .map_err(TransportError::new)?;
    Ok(())
  }
}
