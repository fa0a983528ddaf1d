//! Frame and detection types shared by the pipeline stages.

use chrono::{DateTime, Local};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// A single captured video frame.
///
/// Frames are owned by the pipeline for the duration of one cycle and are
/// never retained by the core after that.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 1-based capture order assigned by the source
    pub index: u64,
    /// Wall-clock time the frame was captured
    pub captured_at: DateTime<Local>,
    /// RGB pixel data
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, captured_at: DateTime<Local>, image: RgbImage) -> Self {
        Self {
            index,
            captured_at,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Frame size as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Axis-aligned region in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rescale a box by independent horizontal and vertical factors.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }
}

/// One labeled object reported by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class name as reported by the model
    pub label: String,
    /// Model confidence (0-1)
    pub confidence: f32,
    /// Object location
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}
