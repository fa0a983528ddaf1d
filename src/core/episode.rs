//! Detection episode tracking.
//!
//! An episode is a maximal run of sampled cycles in which the target is
//! present. The tracker only moves on sampled, conclusive cycles; frames
//! between samples are invisible to it, so a target that leaves and comes
//! back between two samples stays in the same episode.

use serde::Serialize;

/// Presence state of the configured target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EpisodeState {
    /// Target seen on the most recent sampled cycle
    pub presence: bool,
    /// Alert already dispatched for the current run
    pub notified: bool,
}

/// What the rest of the pipeline should do after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    /// A new episode began; start a recording if none is running
    pub begin_recording: bool,
    /// First alert of this episode should go out
    pub dispatch_alert: bool,
}

impl Signals {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.begin_recording && !self.dispatch_alert
    }
}

/// Two-state machine over sampled presence results.
#[derive(Debug, Default)]
pub struct EpisodeTracker {
    state: EpisodeState,
    episodes: u64,
}

impl EpisodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Number of episodes started since creation.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    /// Feed the result of one sampled, conclusive cycle.
    pub fn observe(&mut self, target_present: bool) -> Signals {
        let (next, signals) = transition(self.state, target_present);
        if signals.begin_recording {
            self.episodes += 1;
        }
        self.state = next;
        signals
    }
}

fn transition(state: EpisodeState, target_present: bool) -> (EpisodeState, Signals) {
    if !target_present {
        return (EpisodeState::default(), Signals::none());
    }

    let mut signals = Signals::none();
    let mut next = state;

    if !state.presence {
        next = EpisodeState {
            presence: true,
            notified: false,
        };
        signals.begin_recording = true;
    }

    if !next.notified {
        signals.dispatch_alert = true;
        next.notified = true;
    }

    (next, signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_to_present() {
        let (next, signals) = transition(EpisodeState::default(), true);

        assert_eq!(
            next,
            EpisodeState {
                presence: true,
                notified: true
            }
        );
        assert!(signals.begin_recording);
        assert!(signals.dispatch_alert);
    }

    #[test]
    fn present_stays_quiet() {
        let state = EpisodeState {
            presence: true,
            notified: true,
        };
        let (next, signals) = transition(state, true);

        assert_eq!(next, state);
        assert!(signals.is_empty());
    }

    #[test]
    fn present_to_absent_resets_both_flags() {
        let state = EpisodeState {
            presence: true,
            notified: true,
        };
        let (next, signals) = transition(state, false);

        assert_eq!(next, EpisodeState::default());
        assert!(signals.is_empty());
    }

    #[test]
    fn one_alert_per_present_run() {
        let mut tracker = EpisodeTracker::new();
        let results = [
            false, true, true, true, false, false, true, false, true, true,
        ];

        let alerts = results
            .iter()
            .filter(|&&present| tracker.observe(present).dispatch_alert)
            .count();

        assert_eq!(alerts, 3);
        assert_eq!(tracker.episodes(), 3);
    }

    #[test]
    fn notified_implies_presence() {
        let mut tracker = EpisodeTracker::new();
        for present in [true, false, true, true, false, false, true] {
            tracker.observe(present);
            let state = tracker.state();
            assert!(!state.notified || state.presence);
        }
    }
}
