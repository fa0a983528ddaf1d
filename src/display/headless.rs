//! Display for machines without a screen.
//!
//! Frames are counted and, when a snapshot path is configured, the most
//! recent annotated frame is written there so an operator can see what set
//! off the last alert.

use crate::display::{DisplayError, FrameDisplay, FrameView};
use std::path::PathBuf;

/// Counts frames and optionally keeps the latest annotated frame on disk.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    snapshot_path: Option<PathBuf>,
    frames_shown: u64,
    annotated_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the latest annotated frame at `path`.
    pub fn with_snapshot(path: PathBuf) -> Self {
        Self {
            snapshot_path: Some(path),
            ..Self::default()
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn annotated_shown(&self) -> u64 {
        self.annotated_shown
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, view: FrameView<'_>) -> Result<(), DisplayError> {
        self.frames_shown += 1;
        if !view.is_annotated() {
            return Ok(());
        }
        self.annotated_shown += 1;

        if let Some(ref path) = self.snapshot_path {
            view.image()
                .save(path)
                .map_err(|e| DisplayError::Io(format!("{}: {e}", path.display())))?;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), DisplayError> {
        tracing::debug!(
            frames = self.frames_shown,
            annotated = self.annotated_shown,
            "Display released"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::Frame;
    use chrono::Local;
    use image::RgbImage;

    #[test]
    fn test_counts_and_writes_snapshot() {
        let path = std::env::temp_dir().join(format!("surveil-latest-{}.png", uuid::Uuid::new_v4()));
        let mut display = HeadlessDisplay::with_snapshot(path.clone());
        let frame = Frame::new(1, Local::now(), RgbImage::new(8, 8));

        display.show(FrameView::Raw(&frame)).unwrap();
        assert!(!path.exists());

        display
            .show(FrameView::Annotated {
                frame: &frame,
                image: RgbImage::new(8, 8),
            })
            .unwrap();
        assert!(path.exists());
        assert_eq!(display.frames_shown(), 2);
        assert_eq!(display.annotated_shown(), 1);

        std::fs::remove_file(&path).ok();
    }
}
