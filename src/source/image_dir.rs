//! Replay of a directory of still frames.
//!
//! Files are read in lexical order of their names, so `frame_0001.jpg`,
//! `frame_0002.jpg`, ... come out in capture order. Anything the `image`
//! crate cannot identify by extension is skipped when the directory is
//! scanned.

use crate::source::types::Frame;
use crate::source::{FrameSource, SourceError};
use chrono::Local;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Frame source backed by image files on disk.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    released: bool,
}

impl ImageSequenceSource {
    /// Scan `dir` for frame images.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| SourceError::Open(format!("{}: {e}", dir.display())))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_frame_file(p))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SourceError::Open(format!(
                "no frame images found in {}",
                dir.display()
            )));
        }

        tracing::info!(count = files.len(), dir = %dir.display(), "Frame sequence opened");

        Ok(Self {
            files,
            position: 0,
            released: false,
        })
    }

    /// Number of frames not yet read.
    pub fn remaining(&self) -> usize {
        self.files.len().saturating_sub(self.position)
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.released {
            return Err(SourceError::Released);
        }

        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        let index = self.position as u64;

        let image = image::open(path)
            .map_err(|e| SourceError::Read {
                index,
                reason: format!("{}: {e}", path.display()),
            })?
            .to_rgb8();

        Ok(Some(Frame::new(index, Local::now(), image)))
    }

    fn release(&mut self) -> Result<(), SourceError> {
        self.released = true;
        self.files.clear();
        Ok(())
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("surveil-frames-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_frames_in_name_order() {
        let dir = scratch_dir();
        RgbImage::new(4, 4).save(dir.join("frame_002.png")).unwrap();
        RgbImage::new(8, 8).save(dir.join("frame_001.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.read().unwrap().unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.size(), (8, 8));

        let second = source.read().unwrap().unwrap();
        assert_eq!(second.index, 2);
        assert_eq!(second.size(), (4, 4));

        assert!(source.read().unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = scratch_dir();
        assert!(matches!(
            ImageSequenceSource::open(&dir),
            Err(SourceError::Open(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_read_after_release_fails() {
        let dir = scratch_dir();
        RgbImage::new(2, 2).save(dir.join("a.png")).unwrap();

        let mut source = ImageSequenceSource::open(&dir).unwrap();
        source.release().unwrap();
        assert!(matches!(source.read(), Err(SourceError::Released)));
        std::fs::remove_dir_all(&dir).ok();
    }
}
