use super::{EchoProber, PingProgress, PingResult, PingStatus, Probe, ProbeConfig, SessionStats};
use crate::resolve::TargetAddress;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Session context for repeated echo probes against one target.
#[derive(Clone, Debug)]
pub struct Pinger {
    /// Destination address.
    pub target: TargetAddress,
    /// Settings applied to every probe.
    pub probe_config: ProbeConfig,
    /// Echo identifier. Defaults to the low 16 bits of the process id.
    pub identifier: u16,
    /// Number of probes to send. `None` runs until stopped.
    pub probe_count: Option<u64>,
    /// Delay between consecutive probes. Default is one second.
    pub send_interval: Duration,
    stop: Arc<AtomicBool>,
    progress_tx: Sender<PingProgress>,
    progress_rx: Arc<Mutex<Receiver<PingProgress>>>,
}

impl Pinger {
    /// Creates a `Pinger` with default settings and an unbounded count.
    pub fn new(target: TargetAddress) -> Pinger {
        let (progress_tx, progress_rx) = channel();
        Pinger {
            target,
            probe_config: ProbeConfig::default(),
            identifier: super::process_identifier(),
            probe_count: None,
            send_interval: Duration::from_secs(1),
            stop: Arc::new(AtomicBool::new(false)),
            progress_tx,
            progress_rx: Arc::new(Mutex::new(progress_rx)),
        }
    }
    /// Runs the session with raw ICMP sockets.
    pub fn ping(&self) -> PingResult {
        self.ping_with(&mut EchoProber::new())
    }
    /// Runs the session, sending each probe through `prober`.
    ///
    /// Probes run one at a time. A stop request is honoured before the
    /// next probe, never during a probe or the interval sleep.
    pub fn ping_with<P: Probe>(&self, prober: &mut P) -> PingResult {
        let start_time = Instant::now();
        let mut stats = SessionStats::new();
        let mut tick: u64 = 0;
        info!(dst = %self.target, count = ?self.probe_count, "starting ping session");

        let status = loop {
            if self.probe_count.is_some_and(|count| tick >= count) {
                break PingStatus::Done;
            }
            if self.stop.load(Ordering::SeqCst) {
                break PingStatus::Interrupted;
            }
            tick += 1;
            let sequence = tick as u16;

            let outcome = prober.probe(&self.target, &self.probe_config, self.identifier, sequence);
            stats.record(&outcome);
            debug!(
                seq = sequence,
                sent = stats.sent,
                received = stats.received,
                loss = stats.loss_percent(),
                "tick"
            );
            let _ = self.progress_tx.send(PingProgress { outcome, stats });

            if self.probe_count != Some(tick) {
                thread::sleep(self.send_interval);
            }
        };

        info!(
            dst = %self.target,
            ?status,
            sent = stats.sent,
            received = stats.received,
            "ping session finished"
        );
        PingResult {
            stats,
            status,
            probe_time: Instant::now().duration_since(start_time),
        }
    }
    /// Asks a running session to stop before its next probe.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
    /// Returns the flag checked between probes, for signal handlers.
    pub fn get_stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
    /// Returns the receiver for per-probe progress events.
    pub fn get_progress_receiver(&self) -> Arc<Mutex<Receiver<PingProgress>>> {
        Arc::clone(&self.progress_rx)
    }
    /// Returns the destination address.
    pub fn get_target(&self) -> TargetAddress {
        self.target
    }
    /// Sets the probe settings.
    pub fn set_probe_config(&mut self, probe_config: ProbeConfig) {
        self.probe_config = probe_config;
    }
    /// Returns the probe settings.
    pub fn get_probe_config(&self) -> &ProbeConfig {
        &self.probe_config
    }
    /// Sets the echo identifier.
    pub fn set_identifier(&mut self, identifier: u16) {
        self.identifier = identifier;
    }
    /// Returns the echo identifier.
    pub fn get_identifier(&self) -> u16 {
        self.identifier
    }
    /// Sets the number of probes. `None` means unbounded.
    pub fn set_probe_count(&mut self, probe_count: Option<u64>) {
        self.probe_count = probe_count;
    }
    /// Returns the number of probes.
    pub fn get_probe_count(&self) -> Option<u64> {
        self.probe_count
    }
    /// Sets the interval between probes.
    pub fn set_send_interval(&mut self, send_interval: Duration) {
        self.send_interval = send_interval;
    }
    /// Returns the interval between probes.
    pub fn get_send_interval(&self) -> Duration {
        self.send_interval
    }
}
