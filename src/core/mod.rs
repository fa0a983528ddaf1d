//! Core decision logic for the surveillance pipeline.
//!
//! This module contains:
//! - The frame sampling gate
//! - The detection episode state machine
//! - The clock abstraction used for deadlines and timestamps

pub mod clock;
pub mod episode;
pub mod sampler;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use episode::{EpisodeState, EpisodeTracker, Signals};
pub use sampler::{should_sample, Sampler};
