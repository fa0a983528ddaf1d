//! Video recording of detection episodes.
//!
//! A [`SinkFactory`] opens on-disk video outputs; the [`Recorder`] decides
//! when to open and close them. Only the recorder ever holds a sink.

pub mod mjpeg;
pub mod recorder;

pub use mjpeg::MjpegSinkFactory;
pub use recorder::{
    recording_file_name, CloseReason, FinishedRecording, Recorder, RecorderConfig,
};

use crate::source::types::Frame;
use std::path::Path;

/// Errors raised by recording sinks.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to open recording {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("Failed to write frame {index}: {reason}")]
    Write { index: u64, reason: String },
    #[error("Failed to finalize recording: {0}")]
    Close(String),
}

/// An open video output stream.
pub trait RecordingSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Flush and finalize the output. Consumes the sink so it cannot be
    /// written or closed again.
    fn close(self: Box<Self>) -> Result<(), SinkError>;
}

/// Opens recording sinks.
pub trait SinkFactory: Send {
    /// File extension (without the dot) of the outputs this factory writes.
    fn extension(&self) -> &str;

    fn open(
        &mut self,
        path: &Path,
        fps: f64,
        size: (u32, u32),
    ) -> Result<Box<dyn RecordingSink>, SinkError>;
}
