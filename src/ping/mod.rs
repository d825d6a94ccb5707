mod pinger;
mod probe;
mod stats;

pub use pinger::*;
pub use probe::*;
pub use stats::*;

use std::time::Duration;

/// Exit status of a ping session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PingStatus {
    /// The configured number of probes was sent
    Done,
    /// Stopped by a cancellation request between probes
    Interrupted,
}

/// Result of a ping session
#[derive(Clone, Debug)]
pub struct PingResult {
    /// Accumulated statistics
    pub stats: SessionStats,
    /// Session status
    pub status: PingStatus,
    /// Wall-clock duration of the whole session
    pub probe_time: Duration,
}

/// Progress event published after every probe.
#[derive(Debug)]
pub struct PingProgress {
    /// Outcome of the probe that just completed
    pub outcome: ProbeOutcome,
    /// Statistics including that outcome
    pub stats: SessionStats,
}
