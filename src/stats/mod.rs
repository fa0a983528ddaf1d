//! Activity statistics for the surveillance agent.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_stats, create_shared_stats_with_persistence, SessionStats,
    SharedSessionStats, StatsSnapshot,
};
