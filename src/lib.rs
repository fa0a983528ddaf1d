//! Surveil Agent - detection-triggered recording and alerting for live video.
//!
//! The agent watches a stream of frames for one class of object. Every few
//! frames it asks a detector whether the object is in view; when it first
//! appears, a fixed-length recording starts and a single alert goes out.
//!
//! # Guarantees
//!
//! - **One alert per episode**: an alert is sent when the target first
//!   appears and not again until it has been seen absent on a sampled frame
//! - **One recording at a time**: a recording runs for a fixed duration and
//!   is closed exactly once, on timeout, on write failure or on shutdown
//! - **Non-blocking alerts**: mail delivery runs off the frame loop and its
//!   failures never stop detection or recording
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Surveil Agent                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Source    │──▶│   Sampler   │──▶│  Detector   │         │
//! │  │  (frames)   │   │ (every n-th)│   │  (remote)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │         │                                    │                │
//! │         ▼                                    ▼                │
//! │  ┌─────────────┐                     ┌─────────────┐         │
//! │  │  Recorder   │◀────────────────────│   Episode   │         │
//! │  │  (MJPEG)    │                     │   Tracker   │         │
//! │  └─────────────┘                     └─────────────┘         │
//! │                                              │                │
//! │                                              ▼                │
//! │                                      ┌─────────────┐         │
//! │                                      │  Notifier   │         │
//! │                                      │ (async SMTP)│         │
//! │                                      └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use surveil_agent::{
//!     core::SystemClock,
//!     detect::{RemoteDetector, RemoteDetectorConfig, Target},
//!     display::HeadlessDisplay,
//!     notify::{LogTransport, Notifier, Recipients},
//!     recording::{MjpegSinkFactory, Recorder, RecorderConfig},
//!     source::ImageSequenceSource,
//!     stats::create_shared_stats,
//!     Pipeline, PipelineParts,
//! };
//!
//! let parts = PipelineParts {
//!     source: Box::new(ImageSequenceSource::open("frames").unwrap()),
//!     detector: Box::new(RemoteDetector::new(RemoteDetectorConfig::new("http://localhost:8000/infer")).unwrap()),
//!     display: Box::new(HeadlessDisplay::new()),
//!     recorder: Recorder::new(
//!         RecorderConfig {
//!             output_dir: "recordings".into(),
//!             duration: chrono::Duration::seconds(120),
//!             fps: 30.0,
//!         },
//!         Box::new(MjpegSinkFactory::default()),
//!     ),
//!     notifier: Notifier::new(
//!         Arc::new(LogTransport),
//!         Recipients { from: "camera".into(), to: "operator".into() },
//!     )
//!     .unwrap(),
//!     clock: Arc::new(SystemClock),
//!     stats: create_shared_stats(),
//! };
//!
//! let mut pipeline = Pipeline::new(Target::new("person"), 5, parts).unwrap();
//! pipeline.run(&AtomicBool::new(false));
//! ```

pub mod config;
pub mod core;
pub mod detect;
pub mod display;
pub mod notify;
pub mod pipeline;
pub mod recording;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, NotificationConfig};
pub use crate::core::{EpisodeState, EpisodeTracker, Sampler, Signals};
pub use detect::{target_present, Detector, DetectorError, Target};
pub use notify::{Alert, Notifier, Transport, TransportError};
pub use pipeline::{ExitReason, Pipeline, PipelineParts};
pub use recording::{Recorder, RecorderConfig, RecordingSink, SinkFactory};
pub use source::{Detection, Frame, FrameSource, SourceError};
pub use stats::{SessionStats, SharedSessionStats};

#[cfg(feature = "remote-detector")]
pub use detect::{RemoteDetector, RemoteDetectorConfig};

#[cfg(feature = "smtp")]
pub use notify::SmtpTransport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
