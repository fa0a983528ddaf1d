//! Frame sampling gate.
//!
//! Detection is expensive, so only every `skip`-th frame is handed to the
//! detector. The gate is purely counter-based and carries no other state.

use crate::config::ConfigError;
use std::num::NonZeroU64;

/// Whether the frame with the given 1-based index should be sampled.
pub fn should_sample(frame_index: u64, skip_interval: NonZeroU64) -> bool {
    frame_index % skip_interval.get() == 0
}

/// Counter-based sampler.
#[derive(Debug, Clone)]
pub struct Sampler {
    skip_interval: NonZeroU64,
    frame_count: u64,
}

impl Sampler {
    /// Create a sampler that opens on every `skip_interval`-th frame.
    pub fn new(skip_interval: u64) -> Result<Self, ConfigError> {
        let skip_interval = NonZeroU64::new(skip_interval)
            .ok_or_else(|| ConfigError::Invalid("frame_skip must be a positive integer".into()))?;

        Ok(Self {
            skip_interval,
            frame_count: 0,
        })
    }

    /// Count one more frame and report `(frame_index, sampled)`.
    pub fn advance(&mut self) -> (u64, bool) {
        self.frame_count += 1;
        (
            self.frame_count,
            should_sample(self.frame_count, self.skip_interval),
        )
    }

    /// Number of frames counted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn skip_interval(&self) -> u64 {
        self.skip_interval.get()
    }
}
