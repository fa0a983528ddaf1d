//! Lifecycle of the single active recording.
//!
//! A session is opened when an episode starts while nothing is recording and
//! runs for a fixed duration, regardless of whether the target stays in view.
//! Every close goes through [`Recorder::finish_session`], which takes the
//! session out of its slot, so a sink can be closed at most once.

use crate::detect::Target;
use crate::recording::{RecordingSink, SinkFactory};
use crate::source::types::Frame;
use chrono::{DateTime, Duration, Local};
use std::path::PathBuf;

/// Timestamp format used in recording file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Build the file name for a recording started at `started_at`.
///
/// The target is written in its lower-cased form, with anything other than
/// ASCII letters, digits, `-` and `_` replaced by `_` so the name always
/// stays inside the output directory.
pub fn recording_file_name(target: &Target, started_at: DateTime<Local>, extension: &str) -> String {
    let name: String = target
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "detected_{}_{}.{}",
        name,
        started_at.format(FILE_TIMESTAMP_FORMAT),
        extension
    )
}

/// Recorder settings.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Directory recordings are written to
    pub output_dir: PathBuf,
    /// How long each recording runs
    pub duration: Duration,
    /// Nominal frame rate written to the sink
    pub fps: f64,
}

/// The active recording.
struct RecordingSession {
    started_at: DateTime<Local>,
    path: PathBuf,
    frames_written: u64,
    sink: Box<dyn RecordingSink>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The configured duration elapsed
    Timeout,
    /// The pipeline is shutting down
    Shutdown,
    /// The sink failed to accept a frame
    WriteError,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRecording {
    pub path: PathBuf,
    pub frames_written: u64,
    pub reason: CloseReason,
    /// Whether the sink finalized cleanly
    pub saved: bool,
}

/// Owns the recording sink and decides when it opens and closes.
pub struct Recorder {
    config: RecorderConfig,
    factory: Box<dyn SinkFactory>,
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new(config: RecorderConfig, factory: Box<dyn SinkFactory>) -> Self {
        Self {
            config,
            factory,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Open a new recording for an episode that just began.
    ///
    /// Does nothing while a session is already running. Returns the path of
    /// the new recording, or `None` if no session was opened.
    pub fn on_episode_start(
        &mut self,
        now: DateTime<Local>,
        target: &Target,
        size: (u32, u32),
    ) -> Option<PathBuf> {
        if self.session.is_some() {
            tracing::debug!("Recording already active, ignoring start signal");
            return None;
        }

        let file_name = recording_file_name(target, now, self.factory.extension());
        let path = self.config.output_dir.join(file_name);

        match self.factory.open(&path, self.config.fps, size) {
            Ok(sink) => {
                tracing::info!(path = %path.display(), "Recording started");
                self.session = Some(RecordingSession {
                    started_at: now,
                    path: path.clone(),
                    frames_written: 0,
                    sink,
                });
                Some(path)
            }
            Err(e) => {
                tracing::error!("Could not start recording: {e}");
                None
            }
        }
    }

    /// Write a frame to the active recording, if any.
    pub fn on_frame(&mut self, frame: &Frame) -> Option<FinishedRecording> {
        let session = self.session.as_mut()?;

        match session.sink.write(frame) {
            Ok(()) => {
                session.frames_written += 1;
                None
            }
            Err(e) => {
                tracing::error!("Recording write failed, closing session: {e}");
                self.finish_session(CloseReason::WriteError)
            }
        }
    }

    /// Close the active recording once its duration has elapsed.
    pub fn tick(&mut self, now: DateTime<Local>) -> Option<FinishedRecording> {
        let started_at = self.session.as_ref()?.started_at;

        if now - started_at >= self.config.duration {
            self.finish_session(CloseReason::Timeout)
        } else {
            None
        }
    }

    /// Close any active recording because the pipeline is stopping.
    pub fn shutdown(&mut self) -> Option<FinishedRecording> {
        self.finish_session(CloseReason::Shutdown)
    }

    fn finish_session(&mut self, reason: CloseReason) -> Option<FinishedRecording> {
        let session = self.session.take()?;
        let RecordingSession {
            path,
            frames_written,
            sink,
            ..
        } = session;

        let saved = match sink.close() {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    frames = frames_written,
                    ?reason,
                    "Recording saved"
                );
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Recording could not be finalized: {e}");
                false
            }
        };

        Some(FinishedRecording {
            path,
            frames_written,
            reason,
            saved,
        })
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::SinkError;
    use chrono::TimeZone;
    use image::RgbImage;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Journal {
        opened: Vec<PathBuf>,
        writes: u64,
        closes: u64,
    }

    struct FakeSink {
        journal: Arc<Mutex<Journal>>,
        fail_writes: bool,
    }

    impl RecordingSink for FakeSink {
        fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
            if self.fail_writes {
                return Err(SinkError::Write {
                    index: frame.index,
                    reason: "disk full".into(),
                });
            }
            self.journal.lock().unwrap().writes += 1;
            Ok(())
        }

        fn close(self: Box<Self>) -> Result<(), SinkError> {
            self.journal.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    struct FakeFactory {
        journal: Arc<Mutex<Journal>>,
        fail_writes: bool,
    }

    impl SinkFactory for FakeFactory {
        fn extension(&self) -> &str {
            "mp4"
        }

        fn open(
            &mut self,
            path: &Path,
            _fps: f64,
            _size: (u32, u32),
        ) -> Result<Box<dyn RecordingSink>, SinkError> {
            self.journal.lock().unwrap().opened.push(path.to_path_buf());
            Ok(Box::new(FakeSink {
                journal: self.journal.clone(),
                fail_writes: self.fail_writes,
            }))
        }
    }

    fn recorder(fail_writes: bool) -> (Recorder, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let config = RecorderConfig {
            output_dir: PathBuf::from("recordings"),
            duration: Duration::seconds(120),
            fps: 30.0,
        };
        let factory = FakeFactory {
            journal: journal.clone(),
            fail_writes,
        };
        (Recorder::new(config, Box::new(factory)), journal)
    }

    fn start_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn frame(index: u64) -> Frame {
        Frame::new(index, start_time(), RgbImage::new(4, 4))
    }

    #[test]
    fn test_file_name_convention() {
        let name = recording_file_name(&Target::new("Person"), start_time(), "mp4");
        assert_eq!(name, "detected_person_2024-03-09_14-05-07.mp4");
    }

    #[test]
    fn test_file_name_stays_in_output_dir() {
        let name = recording_file_name(&Target::new("../../etc/x"), start_time(), "mjpeg");
        assert_eq!(name, "detected_______etc_x_2024-03-09_14-05-07.mjpeg");

        let path = Path::new("recordings").join(&name);
        assert_eq!(path.parent(), Some(Path::new("recordings")));

        let name = recording_file_name(&Target::new("Traffic Light"), start_time(), "mp4");
        assert_eq!(name, "detected_traffic_light_2024-03-09_14-05-07.mp4");
    }

    #[test]
    fn test_second_start_is_noop() {
        let (mut recorder, journal) = recorder(false);
        let target = Target::new("person");

        let path = recorder.on_episode_start(start_time(), &target, (4, 4));
        assert_eq!(
            path,
            Some(PathBuf::from("recordings/detected_person_2024-03-09_14-05-07.mp4"))
        );
        assert!(recorder
            .on_episode_start(start_time() + Duration::seconds(5), &target, (4, 4))
            .is_none());
        assert_eq!(journal.lock().unwrap().opened.len(), 1);
    }

    #[test]
    fn test_timeout_closes_once() {
        let (mut recorder, journal) = recorder(false);
        recorder.on_episode_start(start_time(), &Target::new("person"), (4, 4));

        recorder.on_frame(&frame(1));
        recorder.on_frame(&frame(2));
        assert!(recorder.tick(start_time() + Duration::seconds(119)).is_none());

        let finished = recorder
            .tick(start_time() + Duration::seconds(120))
            .unwrap();
        assert_eq!(finished.reason, CloseReason::Timeout);
        assert_eq!(finished.frames_written, 2);
        assert!(finished.saved);
        assert!(!recorder.is_active());

        assert!(recorder.tick(start_time() + Duration::seconds(500)).is_none());
        assert!(recorder.shutdown().is_none());
        assert_eq!(journal.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_frames_ignored_while_idle() {
        let (mut recorder, journal) = recorder(false);
        assert!(recorder.on_frame(&frame(1)).is_none());
        assert_eq!(journal.lock().unwrap().writes, 0);
    }

    #[test]
    fn test_write_failure_releases_session() {
        let (mut recorder, journal) = recorder(true);
        recorder.on_episode_start(start_time(), &Target::new("person"), (4, 4));

        let finished = recorder.on_frame(&frame(1)).unwrap();
        assert_eq!(finished.reason, CloseReason::WriteError);
        assert!(!recorder.is_active());
        assert_eq!(journal.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_drop_closes_active_session() {
        let (mut recorder, journal) = recorder(false);
        recorder.on_episode_start(start_time(), &Target::new("person"), (4, 4));
        drop(recorder);
        assert_eq!(journal.lock().unwrap().closes, 1);
    }
}
