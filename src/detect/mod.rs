//! Boundary to the object detector.
//!
//! Model loading and inference happen outside this crate. The pipeline only
//! needs an ordered list of labeled detections per sampled frame, and from
//! that list only whether the configured target appears in it.

#[cfg(feature = "remote-detector")]
pub mod remote;

#[cfg(feature = "remote-detector")]
pub use remote::{RemoteDetector, RemoteDetectorConfig};

use crate::source::types::{Detection, Frame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors a detector call can produce.
///
/// Any of these makes the current cycle inconclusive; none ends the loop.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Detector network error: {0}")]
    Network(String),
    #[error("Detector server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Detector response could not be decoded: {0}")]
    Decode(String),
    #[error("Frame could not be encoded for inference: {0}")]
    Encode(String),
    #[error("Detector failed: {0}")]
    Other(String),
}

/// An object detector.
pub trait Detector {
    /// Run inference on a frame, returning detections in model order.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;
}

/// The class name being watched for, stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target(String);

impl Target {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive label comparison.
    pub fn matches(&self, label: &str) -> bool {
        label.to_lowercase() == self.0
    }

    /// Name with the first letter upper-cased, for alert subjects.
    pub fn capitalized(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether any detection carries the target label. Stops at the first hit.
pub fn target_present(detections: &[Detection], target: &Target) -> bool {
    detections.iter().any(|d| target.matches(&d.label))
}
