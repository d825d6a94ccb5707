use super::ProbeOutcome;
use std::time::Duration;

/// Running totals for a session.
///
/// Counters only grow and the RTT extrema only tighten, so
/// `received <= sent` holds after every [`SessionStats::record`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    pub received: u64,
    /// Zero until the first success.
    pub min_rtt: Duration,
    pub max_rtt: Duration,
    pub sum_rtt: Duration,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one probe outcome into the totals.
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.sent += 1;
        if !outcome.succeeded {
            return;
        }
        let rtt = outcome.round_trip_time;
        if self.received == 0 || rtt < self.min_rtt {
            self.min_rtt = rtt;
        }
        if rtt > self.max_rtt {
            self.max_rtt = rtt;
        }
        self.received += 1;
        self.sum_rtt += rtt;
    }

    pub fn lost(&self) -> u64 {
        self.sent - self.received
    }

    /// Share of probes without a reply, in percent. Zero before the first
    /// probe.
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        100.0 - (100.0 * self.received as f64 / self.sent as f64)
    }

    /// Mean RTT over successful probes only.
    pub fn mean_rtt(&self) -> Option<Duration> {
        if self.received == 0 {
            return None;
        }
        let nanos = self.sum_rtt.as_nanos() / self.received as u128;
        Some(Duration::from_nanos(nanos as u64))
    }
}
