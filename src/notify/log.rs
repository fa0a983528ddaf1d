//! Transport that only writes alerts to the log.
//!
//! Used when no mail server is configured, so detections are still visible.

use crate::notify::{Envelope, Transport, TransportError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        tracing::info!(
            to = %envelope.to,
            subject = %envelope.subject,
            "{}",
            envelope.body
        );
        Ok(())
    }
}
