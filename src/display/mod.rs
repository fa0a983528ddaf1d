//! Output of live frames to a viewer.
//!
//! On-screen rendering lives outside this crate. The pipeline hands every
//! frame to a [`FrameDisplay`]; on a sampled cycle where the target was
//! found it hands over an annotated copy instead.

pub mod annotate;
pub mod headless;

pub use annotate::annotate;
pub use headless::HeadlessDisplay;

use crate::source::types::Frame;
use image::RgbImage;

/// Errors raised by displays.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Display I/O error: {0}")]
    Io(String),
}

/// What is shown for one cycle.
pub enum FrameView<'a> {
    /// The frame as captured
    Raw(&'a Frame),
    /// The frame with detection boxes drawn on it
    Annotated { frame: &'a Frame, image: RgbImage },
}

impl FrameView<'_> {
    pub fn frame(&self) -> &Frame {
        match self {
            FrameView::Raw(frame) => frame,
            FrameView::Annotated { frame, .. } => frame,
        }
    }

    pub fn image(&self) -> &RgbImage {
        match self {
            FrameView::Raw(frame) => &frame.image,
            FrameView::Annotated { image, .. } => image,
        }
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, FrameView::Annotated { .. })
    }
}

/// A viewer for live frames.
pub trait FrameDisplay {
    fn show(&mut self, view: FrameView<'_>) -> Result<(), DisplayError>;

    /// Tear down any windows or files. Called once on loop exit.
    fn release(&mut self) -> Result<(), DisplayError>;
}
