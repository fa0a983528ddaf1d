//! Frame acquisition for the surveillance pipeline.
//!
//! The pipeline reads frames through the [`FrameSource`] trait. Camera
//! drivers live outside this crate; the bundled [`ImageSequenceSource`]
//! replays a directory of still frames, which is what the CLI uses.

pub mod image_dir;
pub mod types;

pub use image_dir::ImageSequenceSource;
pub use types::{BoundingBox, Detection, Frame};

/// Errors that can occur while reading frames.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Frame source could not be opened: {0}")]
    Open(String),
    #[error("Failed to read frame {index}: {reason}")]
    Read { index: u64, reason: String },
    #[error("Frame source already released")]
    Released,
}

/// A producer of frames in capture order.
pub trait FrameSource {
    /// Read the next frame.
    ///
    /// `Ok(None)` means the source is exhausted. Both exhaustion and `Err`
    /// end the pipeline loop.
    fn read(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Release the underlying device or files. Called once on loop exit.
    fn release(&mut self) -> Result<(), SourceError>;
}
