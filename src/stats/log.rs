//! Session statistics for the surveillance agent.
//!
//! Counters are atomic so the notifier's reports and the frame loop can
//! both update them through a shared handle. Totals are persisted between
//! runs so `surveil status` can show cumulative activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the current session.
#[derive(Debug)]
pub struct SessionStats {
    /// Frames read from the source
    frames_read: AtomicU64,
    /// Frames handed to the detector
    frames_sampled: AtomicU64,
    /// Detector calls that failed
    detector_failures: AtomicU64,
    /// Detection episodes started
    episodes: AtomicU64,
    /// Alerts handed to the notifier
    alerts_dispatched: AtomicU64,
    /// Alerts the transport accepted
    alerts_sent: AtomicU64,
    /// Alerts that failed to send
    alerts_failed: AtomicU64,
    /// Recordings opened
    recordings_started: AtomicU64,
    /// Recordings finalized cleanly
    recordings_saved: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SessionStats {
    /// Create a new, empty statistics log.
    pub fn new() -> Self {
        Self {
            frames_read: AtomicU64::new(0),
            frames_sampled: AtomicU64::new(0),
            detector_failures: AtomicU64::new(0),
            episodes: AtomicU64::new(0),
            alerts_dispatched: AtomicU64::new(0),
            alerts_sent: AtomicU64::new(0),
            alerts_failed: AtomicU64::new(0),
            recordings_started: AtomicU64::new(0),
            recordings_saved: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a statistics log that continues from totals stored at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous session stats: {e}");
        }

        stats
    }

    pub fn record_frame(&self) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.frames_sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detector_failure(&self) {
        self.detector_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episode(&self) {
        self.episodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_dispatched(&self) {
        self.alerts_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_sent(&self) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_failed(&self) {
        self.alerts_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recording_started(&self) {
        self.recordings_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recording_saved(&self) {
        self.recordings_saved.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_sampled: self.frames_sampled.load(Ordering::Relaxed),
            detector_failures: self.detector_failures.load(Ordering::Relaxed),
            episodes: self.episodes.load(Ordering::Relaxed),
            alerts_dispatched: self.alerts_dispatched.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            alerts_failed: self.alerts_failed.load(Ordering::Relaxed),
            recordings_started: self.recordings_started.load(Ordering::Relaxed),
            recordings_saved: self.recordings_saved.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    ///
    /// Counters loaded from disk include earlier runs; only the duration is
    /// for this session alone.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        let heading = if self.persist_path.is_some() {
            "Cumulative Statistics"
        } else {
            "Session Statistics"
        };
        format!(
            "{}:\n\
             - Frames read: {}\n\
             - Frames sampled: {}\n\
             - Detector failures: {}\n\
             - Episodes: {}\n\
             - Alerts dispatched: {} (sent: {}, failed: {})\n\
             - Recordings: {} started, {} saved\n\
             - This session: {} seconds",
            heading,
            stats.frames_read,
            stats.frames_sampled,
            stats.detector_failures,
            stats.episodes,
            stats.alerts_dispatched,
            stats.alerts_sent,
            stats.alerts_failed,
            stats.recordings_started,
            stats.recordings_saved,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                frames_read: stats.frames_read,
                frames_sampled: stats.frames_sampled,
                detector_failures: stats.detector_failures,
                episodes: stats.episodes,
                alerts_dispatched: stats.alerts_dispatched,
                alerts_sent: stats.alerts_sent,
                alerts_failed: stats.alerts_failed,
                recordings_started: stats.recordings_started,
                recordings_saved: stats.recordings_saved,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load persisted totals from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_read
                    .store(persisted.frames_read, Ordering::Relaxed);
                self.frames_sampled
                    .store(persisted.frames_sampled, Ordering::Relaxed);
                self.detector_failures
                    .store(persisted.detector_failures, Ordering::Relaxed);
                self.episodes.store(persisted.episodes, Ordering::Relaxed);
                self.alerts_dispatched
                    .store(persisted.alerts_dispatched, Ordering::Relaxed);
                self.alerts_sent
                    .store(persisted.alerts_sent, Ordering::Relaxed);
                self.alerts_failed
                    .store(persisted.alerts_failed, Ordering::Relaxed);
                self.recordings_started
                    .store(persisted.recordings_started, Ordering::Relaxed);
                self.recordings_saved
                    .store(persisted.recordings_saved, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub detector_failures: u64,
    pub episodes: u64,
    pub alerts_dispatched: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub recordings_started: u64,
    pub recordings_saved: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_read: u64,
    frames_sampled: u64,
    detector_failures: u64,
    episodes: u64,
    #[serde(default)]
    alerts_dispatched: u64,
    alerts_sent: u64,
    alerts_failed: u64,
    #[serde(default)]
    recordings_started: u64,
    recordings_saved: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared statistics.
pub type SharedSessionStats = Arc<SessionStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}

/// Create new shared statistics with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedSessionStats {
    Arc::new(SessionStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = SessionStats::new();

        stats.record_frame();
        stats.record_frame();
        stats.record_sample();
        stats.record_alert_dispatched();
        stats.record_alert_failed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_read, 2);
        assert_eq!(snapshot.frames_sampled, 1);
        assert_eq!(snapshot.alerts_dispatched, 1);
        assert_eq!(snapshot.alerts_failed, 1);
        assert_eq!(snapshot.alerts_sent, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("surveil-stats-{}", uuid::Uuid::new_v4()))
            .join("stats.json");

        let stats = SessionStats::with_persistence(path.clone());
        stats.record_frame();
        stats.record_episode();
        stats.record_alert_dispatched();
        stats.record_alert_sent();
        stats.record_recording_started();
        stats.record_recording_saved();
        stats.save().unwrap();

        let reloaded = SessionStats::with_persistence(path.clone());
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.frames_read, 1);
        assert_eq!(snapshot.episodes, 1);
        assert_eq!(snapshot.alerts_dispatched, 1);
        assert_eq!(snapshot.alerts_sent, 1);
        assert_eq!(snapshot.recordings_started, 1);
        assert_eq!(snapshot.recordings_saved, 1);
        assert!(reloaded.summary().starts_with("Cumulative Statistics:"));

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_summary_format() {
        let summary = SessionStats::new().summary();

        assert!(summary.starts_with("Session Statistics:"));
        assert!(summary.contains("Frames read"));
        assert!(summary.contains("Episodes"));
        assert!(summary.contains("Recordings"));
    }
}
