//! Asynchronous detection alerts.
//!
//! The [`Notifier`] sends at most what it is asked to: deduplication per
//! episode is the episode tracker's job. Each dispatch runs as a detached
//! task on a runtime owned by the notifier, so slow or failing mail servers
//! never hold up the frame loop. Outcomes come back over a channel as
//! [`DispatchReport`]s.

pub mod log;
#[cfg(feature = "smtp")]
pub mod smtp;

pub use self::log::LogTransport;
#[cfg(feature = "smtp")]
pub use smtp::SmtpTransport;

use crate::detect::Target;
use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// Timestamp format used in alert bodies.
pub const ALERT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised by notification transports.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Could not reach mail server: {0}")]
    Connection(String),
    #[error("Mail server rejected credentials: {0}")]
    Authentication(String),
    #[error("Mail server refused message: {0}")]
    Send(String),
    #[error("Message could not be built: {0}")]
    Message(String),
}

/// A fully composed outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A way of delivering alerts. Implementations may block.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

/// Immutable snapshot of what was detected and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub target: Target,
    pub detected_at: DateTime<Local>,
}

impl Alert {
    pub fn new(target: Target, detected_at: DateTime<Local>) -> Self {
        Self {
            target,
            detected_at,
        }
    }

    pub fn subject(&self) -> String {
        format!("{} Detected Alert!", self.target.capitalized())
    }

    pub fn body(&self) -> String {
        format!(
            "A {} was detected at {}.",
            self.target,
            self.detected_at.format(ALERT_TIMESTAMP_FORMAT)
        )
    }
}

/// Why a dispatch did not deliver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Dispatch task aborted: {0}")]
    Aborted(String),
}

/// Result of one dispatch, reported back to the pipeline.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub alert: Alert,
    pub outcome: Result<(), DispatchFailure>,
}

/// Sender and receiver identities placed on every message.
#[derive(Debug, Clone)]
pub struct Recipients {
    pub from: String,
    pub to: String,
}

/// Detached alert dispatcher.
pub struct Notifier {
    runtime: Option<Runtime>,
    transport: Arc<dyn Transport>,
    recipients: Recipients,
    reports_tx: Sender<DispatchReport>,
    reports_rx: Receiver<DispatchReport>,
    in_flight: Vec<JoinHandle<()>>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, recipients: Recipients) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(4)
            .thread_name("surveil-notify")
            .enable_all()
            .build()?;
        let (reports_tx, reports_rx) = unbounded();

        Ok(Self {
            runtime: Some(runtime),
            transport,
            recipients,
            reports_tx,
            reports_rx,
            in_flight: Vec::new(),
        })
    }

    /// Compose the message for an alert.
    pub fn compose(&self, alert: &Alert) -> Envelope {
        Envelope {
            from: self.recipients.from.clone(),
            to: self.recipients.to.clone(),
            subject: alert.subject(),
            body: alert.body(),
        }
    }

    /// Send an alert in the background. Returns immediately.
    pub fn dispatch(&mut self, alert: Alert) {
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!("Notifier already shut down, dropping alert");
            return;
        };

        let envelope = self.compose(&alert);
        let transport = Arc::clone(&self.transport);
        let reports = self.reports_tx.clone();

        self.in_flight.retain(|handle| !handle.is_finished());

        let handle = runtime.spawn(async move {
            let sent = tokio::task::spawn_blocking(move || transport.send(&envelope)).await;

            let outcome = match sent {
                Ok(Ok(())) => {
                    tracing::info!(target_object = %alert.target, "Alert notification sent");
                    Ok(())
                }
                Ok(Err(e)) => {
                    tracing::warn!("Alert notification failed: {e}");
                    Err(DispatchFailure::Transport(e))
                }
                Err(e) => {
                    tracing::error!("Alert dispatch task aborted: {e}");
                    Err(DispatchFailure::Aborted(e.to_string()))
                }
            };

            let _ = reports.send(DispatchReport { alert, outcome });
        });

        self.in_flight.push(handle);
    }

    /// Collect reports from finished dispatches without blocking.
    pub fn drain_reports(&self) -> Vec<DispatchReport> {
        self.reports_rx.try_iter().collect()
    }

    /// Wait up to `grace` for outstanding dispatches, then stop the runtime.
    ///
    /// Returns the number of dispatches abandoned.
    pub fn shutdown(&mut self, grace: Duration) -> usize {
        let Some(runtime) = self.runtime.take() else {
            return 0;
        };
        let handles = std::mem::take(&mut self.in_flight);
        let pending = handles.iter().filter(|h| !h.is_finished()).count();

        let abandoned = if pending == 0 {
            0
        } else {
            tracing::info!(pending, "Waiting for alert dispatches to finish");
            let waited = runtime.block_on(async {
                tokio::time::timeout(grace, async {
                    for handle in handles {
                        let _ = handle.await;
                    }
                })
                .await
            });
            match waited {
                Ok(()) => 0,
                Err(_) => {
                    tracing::warn!("Gave up waiting for alert dispatches after {grace:?}");
                    pending
                }
            }
        };

        runtime.shutdown_background();
        abandoned
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct CapturingTransport {
        sent: Mutex<Vec<Envelope>>,
        fail_with: Option<TransportError>,
    }

    impl Transport for CapturingTransport {
        fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.sent.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn send(&self, _envelope: &Envelope) -> Result<(), TransportError> {
            panic!("transport exploded");
        }
    }

    fn recipients() -> Recipients {
        Recipients {
            from: "cam@example.com".into(),
            to: "owner@example.com".into(),
        }
    }

    fn alert() -> Alert {
        Alert::new(
            Target::new("person"),
            Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        )
    }

    #[test]
    fn test_alert_wording() {
        let alert = alert();
        assert_eq!(alert.subject(), "Person Detected Alert!");
        assert_eq!(alert.body(), "A person was detected at 2024-03-09 14:05:07.");
    }

    #[test]
    fn test_dispatch_delivers_and_reports() {
        let transport = Arc::new(CapturingTransport {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        });
        let mut notifier = Notifier::new(transport.clone(), recipients()).unwrap();

        notifier.dispatch(alert());
        assert_eq!(notifier.shutdown(Duration::from_secs(5)), 0);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "cam@example.com");
        assert_eq!(sent[0].to, "owner@example.com");

        let reports = notifier.drain_reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].outcome.is_ok());
    }

    #[test]
    fn test_transport_failure_is_reported_not_raised() {
        let transport = Arc::new(CapturingTransport {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(TransportError::Authentication("535".into())),
        });
        let mut notifier = Notifier::new(transport, recipients()).unwrap();

        notifier.dispatch(alert());
        notifier.shutdown(Duration::from_secs(5));

        let reports = notifier.drain_reports();
        assert!(matches!(
            reports[0].outcome,
            Err(DispatchFailure::Transport(TransportError::Authentication(_)))
        ));
    }

    #[test]
    fn test_transport_panic_is_contained() {
        let mut notifier = Notifier::new(Arc::new(PanickingTransport), recipients()).unwrap();

        notifier.dispatch(alert());
        notifier.shutdown(Duration::from_secs(5));

        let reports = notifier.drain_reports();
        assert!(matches!(reports[0].outcome, Err(DispatchFailure::Aborted(_))));
    }

    #[test]
    fn test_dispatch_after_shutdown_is_dropped() {
        let transport = Arc::new(CapturingTransport {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        });
        let mut notifier = Notifier::new(transport.clone(), recipients()).unwrap();
        notifier.shutdown(Duration::from_secs(1));

        notifier.dispatch(alert());
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(notifier.drain_reports().is_empty());
    }
}
