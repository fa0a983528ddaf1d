//! The frame loop tying sampling, detection, recording and alerting together.
//!
//! Each cycle runs to completion before the next frame is read:
//!
//! 1. read a frame (exhaustion or failure ends the loop)
//! 2. advance the sampler
//! 3. on sampled cycles, run the detector and feed the episode tracker,
//!    which may start a recording and dispatch an alert
//! 4. write the frame to the active recording, sampled or not
//! 5. close the recording if its time is up
//! 6. show the frame, annotated when the target was just seen
//! 7. check the stop flag
//!
//! Whatever ends the loop, the source, the recording and the display are
//! released in that order, each independently of the others failing.

use crate::config::ConfigError;
use crate::core::{Clock, EpisodeState, EpisodeTracker, Sampler, Signals};
use crate::detect::{target_present, Detector, Target};
use crate::display::{annotate, FrameDisplay, FrameView};
use crate::notify::{Alert, DispatchReport, Notifier};
use crate::recording::{FinishedRecording, Recorder};
use crate::source::types::{Detection, Frame};
use crate::source::{FrameSource, SourceError};
use crate::stats::SharedSessionStats;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Why the loop ended.
#[derive(Debug)]
pub enum ExitReason {
    /// The stop flag was raised
    Stopped,
    /// The source ran out of frames
    SourceExhausted,
    /// The source failed to deliver a frame
    SourceFailed(SourceError),
}

/// The collaborators a pipeline drives.
pub struct PipelineParts {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub display: Box<dyn FrameDisplay>,
    pub recorder: Recorder,
    pub notifier: Notifier,
    pub clock: Arc<dyn Clock>,
    pub stats: SharedSessionStats,
}

/// Detection-triggered recording and alerting loop.
pub struct Pipeline {
    target: Target,
    sampler: Sampler,
    episodes: EpisodeTracker,
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    display: Box<dyn FrameDisplay>,
    recorder: Recorder,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    stats: SharedSessionStats,
    notify_grace: Duration,
    released: bool,
}

impl Pipeline {
    /// Build a pipeline watching for `target` on every `frame_skip`-th frame.
    pub fn new(target: Target, frame_skip: u64, parts: PipelineParts) -> Result<Self, ConfigError> {
        if target.as_str().is_empty() {
            return Err(ConfigError::Invalid("target_object must not be empty".into()));
        }

        Ok(Self {
            target,
            sampler: Sampler::new(frame_skip)?,
            episodes: EpisodeTracker::new(),
            source: parts.source,
            detector: parts.detector,
            display: parts.display,
            recorder: parts.recorder,
            notifier: parts.notifier,
            clock: parts.clock,
            stats: parts.stats,
            notify_grace: Duration::from_secs(5),
            released: false,
        })
    }

    /// How long shutdown waits for in-flight alerts.
    pub fn with_notify_grace(mut self, grace: Duration) -> Self {
        self.notify_grace = grace;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn episode_state(&self) -> EpisodeState {
        self.episodes.state()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn frames_processed(&self) -> u64 {
        self.sampler.frame_count()
    }

    /// Run until the source ends or `stop` is raised, then release everything.
    pub fn run(&mut self, stop: &AtomicBool) -> ExitReason {
        tracing::info!(
            target_object = %self.target,
            frame_skip = self.sampler.skip_interval(),
            "Monitoring started"
        );

        let reason = loop {
            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Frame source exhausted");
                    break ExitReason::SourceExhausted;
                }
                Err(e) => {
                    tracing::error!("Failed to capture frame: {e}");
                    break ExitReason::SourceFailed(e);
                }
            };

            self.process_frame(frame);

            if stop.load(Ordering::SeqCst) {
                tracing::info!("Stop requested");
                break ExitReason::Stopped;
            }
        };

        self.release();
        reason
    }

    /// Run one cycle on a frame that has already been read.
    pub fn process_frame(&mut self, frame: Frame) {
        self.stats.record_frame();
        let (index, sampled) = self.sampler.advance();
        let now = self.clock.now();

        let mut hit: Option<Vec<Detection>> = None;
        if sampled {
            self.stats.record_sample();
            match self.detector.infer(&frame) {
                Ok(detections) => {
                    let present = target_present(&detections, &self.target);
                    let signals = self.episodes.observe(present);
                    if present {
                        tracing::debug!(frame = index, target_object = %self.target, "Target in view");
                        hit = Some(detections);
                    }
                    self.react(signals, now, &frame);
                }
                Err(e) => {
                    // Inconclusive cycle: episode state stays as it was.
                    tracing::warn!(frame = index, "Detection failed, skipping cycle: {e}");
                    self.stats.record_detector_failure();
                }
            }
        }

        if let Some(finished) = self.recorder.on_frame(&frame) {
            self.note_finished(finished);
        }
        if let Some(finished) = self.recorder.tick(now) {
            self.note_finished(finished);
        }

        let view = match hit {
            Some(detections) => FrameView::Annotated {
                frame: &frame,
                image: annotate(&frame.image, &detections),
            },
            None => FrameView::Raw(&frame),
        };
        if let Err(e) = self.display.show(view) {
            tracing::warn!(frame = index, "Display failed: {e}");
        }

        self.absorb_reports();
    }

    fn react(&mut self, signals: Signals, now: DateTime<Local>, frame: &Frame) {
        if signals.begin_recording {
            tracing::info!("{} DETECTED", self.target.as_str().to_uppercase());
            self.stats.record_episode();
            if self
                .recorder
                .on_episode_start(now, &self.target, frame.size())
                .is_some()
            {
                self.stats.record_recording_started();
            }
        }

        if signals.dispatch_alert {
            self.notifier.dispatch(Alert::new(self.target.clone(), now));
            self.stats.record_alert_dispatched();
        }
    }

    fn note_finished(&self, finished: FinishedRecording) {
        if finished.saved {
            self.stats.record_recording_saved();
        }
    }

    fn absorb_reports(&self) {
        for report in self.notifier.drain_reports() {
            self.note_report(&report);
        }
    }

    fn note_report(&self, report: &DispatchReport) {
        match report.outcome {
            Ok(()) => self.stats.record_alert_sent(),
            Err(_) => self.stats.record_alert_failed(),
        }
    }

    /// Release the source, the recording and the display, then let pending
    /// alerts finish. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.source.release() {
            tracing::warn!("Failed to release frame source: {e}");
        }

        if let Some(finished) = self.recorder.shutdown() {
            self.note_finished(finished);
        }

        if let Err(e) = self.display.release() {
            tracing::warn!("Failed to release display: {e}");
        }

        let abandoned = self.notifier.shutdown(self.notify_grace);
        if abandoned > 0 {
            tracing::warn!(abandoned, "Alerts still in flight at shutdown");
        }
        self.absorb_reports();
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.release();
    }
}
