//! SMTP delivery of detection alerts.
//!
//! Connects with STARTTLS and logs in with the sender address and secret.

use crate::config::NotificationConfig;
use crate::notify::{Envelope, Transport, TransportError};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::Transport as _;
use std::time::Duration;

/// SMTP response code for failed authentication.
const AUTH_FAILED_CODE: &str = "535";

/// Mail delivery over an authenticated STARTTLS relay.
pub struct SmtpTransport {
    mailer: lettre::SmtpTransport,
    host: String,
}

impl SmtpTransport {
    pub fn new(config: &NotificationConfig) -> Result<Self, TransportError> {
        let mailer = lettre::SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|e| TransportError::Connection(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender_address.clone(),
                config.sender_secret.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build();

        Ok(Self {
            mailer,
            host: config.smtp_host.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Transport for SmtpTransport {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = build_message(envelope)?;
        self.mailer
            .send(&message)
            .map(|_| ())
            .map_err(classify_error)
    }
}

fn build_message(envelope: &Envelope) -> Result<Message, TransportError> {
    let from: Mailbox = envelope
        .from
        .parse()
        .map_err(|e| TransportError::Message(format!("invalid sender '{}': {e}", envelope.from)))?;
    let to: Mailbox = envelope
        .to
        .parse()
        .map_err(|e| TransportError::Message(format!("invalid receiver '{}': {e}", envelope.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(envelope.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(envelope.body.clone())
        .map_err(|e| TransportError::Message(e.to_string()))
}

fn classify_error(err: SmtpError) -> TransportError {
    match err.status() {
        Some(code) if code.to_string() == AUTH_FAILED_CODE => {
            TransportError::Authentication(err.to_string())
        }
        Some(_) => TransportError::Send(err.to_string()),
        None => TransportError::Connection(err.to_string()),
    }
}
