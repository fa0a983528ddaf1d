//! Motion-JPEG file sink.
//!
//! Frames are JPEG-encoded and concatenated into a single `.mjpeg` stream,
//! which common players (ffplay, VLC) open directly. The stream has no
//! container, so the frame rate is recorded in a small JSON sidecar next to
//! the video.

use crate::recording::{RecordingSink, SinkError, SinkFactory};
use crate::source::types::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Opens [`MjpegSink`]s.
#[derive(Debug, Clone)]
pub struct MjpegSinkFactory {
    quality: u8,
}

impl MjpegSinkFactory {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for MjpegSinkFactory {
    fn default() -> Self {
        Self::new(80)
    }
}

impl SinkFactory for MjpegSinkFactory {
    fn extension(&self) -> &str {
        "mjpeg"
    }

    fn open(
        &mut self,
        path: &Path,
        fps: f64,
        size: (u32, u32),
    ) -> Result<Box<dyn RecordingSink>, SinkError> {
        let open_error = |reason: String| SinkError::Open {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| open_error(e.to_string()))?;
        }
        let file = File::create(path).map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(MjpegSink {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            fps,
            size,
            quality: self.quality,
            frames_written: 0,
        }))
    }
}

/// Sidecar describing a finished stream.
#[derive(Debug, Serialize)]
struct StreamInfo {
    fps: f64,
    width: u32,
    height: u32,
    frames: u64,
}

/// A single MJPEG output file.
pub struct MjpegSink {
    writer: BufWriter<File>,
    path: PathBuf,
    fps: f64,
    size: (u32, u32),
    quality: u8,
    frames_written: u64,
}

impl RecordingSink for MjpegSink {
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let write_error = |reason: String| SinkError::Write {
            index: frame.index,
            reason,
        };

        // Every frame in a stream must share the size it was opened with.
        let resized;
        let image = if frame.size() == self.size {
            &frame.image
        } else {
            resized = imageops::resize(&frame.image, self.size.0, self.size.1, FilterType::Triangle);
            &resized
        };

        JpegEncoder::new_with_quality(&mut self.writer, self.quality)
            .encode_image(image)
            .map_err(|e| write_error(e.to_string()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), SinkError> {
        self.writer
            .flush()
            .map_err(|e| SinkError::Close(e.to_string()))?;

        let info = StreamInfo {
            fps: self.fps,
            width: self.size.0,
            height: self.size.1,
            frames: self.frames_written,
        };
        let json = serde_json::to_string_pretty(&info).map_err(|e| SinkError::Close(e.to_string()))?;
        std::fs::write(self.path.with_extension("json"), json)
            .map_err(|e| SinkError::Close(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use image::RgbImage;

    #[test]
    fn test_writes_stream_and_sidecar() {
        let dir = std::env::temp_dir().join(format!("surveil-mjpeg-{}", uuid::Uuid::new_v4()));
        let path = dir.join("clip.mjpeg");

        let mut factory = MjpegSinkFactory::default();
        let mut sink = factory.open(&path, 30.0, (32, 24)).unwrap();
        sink.write(&Frame::new(1, Local::now(), RgbImage::new(32, 24)))
            .unwrap();
        // Mismatched sizes are scaled to the stream size.
        sink.write(&Frame::new(2, Local::now(), RgbImage::new(64, 48)))
            .unwrap();
        sink.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let info: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("clip.json")).unwrap()).unwrap();
        assert_eq!(info["frames"], 2);
        assert_eq!(info["width"], 32);

        std::fs::remove_dir_all(&dir).ok();
    }
}
