//! Session loop behaviour with a scripted prober in place of raw sockets.

use pingcli::ping::{
    PingStatus, Pinger, Probe, ProbeConfig, ProbeError, ProbeOutcome, ReplyFilter,
};
use pingcli::{resolve, TargetAddress};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Replays a fixed list of RTTs; `None` is a timed-out probe.
struct ScriptedProber {
    script: Vec<Option<u64>>,
    calls: usize,
    identifiers: Vec<u16>,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl ScriptedProber {
    fn new(script: Vec<Option<u64>>) -> Self {
        ScriptedProber {
            script,
            calls: 0,
            identifiers: vec![],
            stop_after: None,
        }
    }
}

impl Probe for ScriptedProber {
    fn probe(
        &mut self,
        target: &TargetAddress,
        _cfg: &ProbeConfig,
        identifier: u16,
        sequence: u16,
    ) -> ProbeOutcome {
        let step = self.script[self.calls % self.script.len()];
        self.calls += 1;
        self.identifiers.push(identifier);
        if let Some((n, stop)) = &self.stop_after {
            if self.calls == *n {
                stop.store(true, Ordering::SeqCst);
            }
        }
        match step {
            Some(ms) => ProbeOutcome::success(sequence, Duration::from_millis(ms), 64, target.ip()),
            None => ProbeOutcome::failure(sequence, ProbeError::Timeout),
        }
    }
}

fn pinger(count: Option<u64>) -> Pinger {
    let mut pinger = Pinger::new(resolve("127.0.0.1").unwrap());
    pinger.set_probe_count(count);
    pinger.set_send_interval(Duration::ZERO);
    pinger
}

#[test]
fn test_count_three_runs_three_ticks() {
    let mut prober = ScriptedProber::new(vec![Some(1)]);
    let result = pinger(Some(3)).ping_with(&mut prober);

    assert_eq!(prober.calls, 3);
    assert_eq!(result.status, PingStatus::Done);
    assert_eq!(result.stats.sent, 3);
    assert_eq!(result.stats.received, 3);
}

#[test]
fn test_identifier_is_stable_across_probes() {
    let mut p = pinger(Some(5));
    p.set_identifier(0x5151);
    let mut prober = ScriptedProber::new(vec![Some(1), None]);
    p.ping_with(&mut prober);
    assert_eq!(prober.identifiers, vec![0x5151; 5]);
}

#[test]
fn test_unbounded_session_stops_on_request() {
    let p = pinger(None);
    let mut prober = ScriptedProber::new(vec![Some(2), None]);
    prober.stop_after = Some((7, p.get_stop_handle()));

    let result = p.ping_with(&mut prober);

    // The in-flight probe completes before the stop is honoured.
    assert_eq!(prober.calls, 7);
    assert_eq!(result.status, PingStatus::Interrupted);
    assert_eq!(result.stats.sent, 7);
    assert_eq!(result.stats.received, 4);
}

#[test]
fn test_all_lost_session() {
    let result = pinger(Some(4)).ping_with(&mut ScriptedProber::new(vec![None]));
    assert_eq!(result.stats.received, 0);
    assert_eq!(format!("{:.2}", result.stats.loss_percent()), "100.00");
    assert_eq!(result.stats.mean_rtt(), None);
}

#[test]
fn test_all_answered_session() {
    let script = vec![Some(10), Some(30), Some(20)];
    let result = pinger(Some(3)).ping_with(&mut ScriptedProber::new(script));
    let stats = result.stats;
    let mean = stats.mean_rtt().unwrap();
    assert_eq!(format!("{:.2}", stats.loss_percent()), "0.00");
    assert!(stats.min_rtt <= mean && mean <= stats.max_rtt);
    assert_eq!(mean, Duration::from_millis(20));
}

#[test]
fn test_progress_invariants_hold_every_tick() {
    let p = pinger(Some(6));
    let rx = p.get_progress_receiver();
    p.ping_with(&mut ScriptedProber::new(vec![None, Some(3), Some(1)]));

    let rx = rx.lock().unwrap();
    let mut ticks = 0;
    for progress in rx.try_iter() {
        ticks += 1;
        let stats = progress.stats;
        assert!(stats.received <= stats.sent);
        if stats.received > 0 {
            assert!(stats.min_rtt <= stats.max_rtt);
        }
    }
    assert_eq!(ticks, 6);
}

#[test]
fn test_unresolvable_target_never_probes() {
    let mut prober = ScriptedProber::new(vec![Some(1)]);
    let session = resolve("").map(|target| {
        let mut p = Pinger::new(target);
        p.set_probe_count(Some(3));
        p.ping_with(&mut prober)
    });
    assert!(session.is_err());
    assert_eq!(prober.calls, 0);
}

#[test]
fn test_probe_config_reaches_prober() {
    struct ConfigProbe(Vec<ProbeConfig>);
    impl Probe for ConfigProbe {
        fn probe(
            &mut self,
            _target: &TargetAddress,
            cfg: &ProbeConfig,
            _identifier: u16,
            sequence: u16,
        ) -> ProbeOutcome {
            self.0.push(cfg.clone());
            ProbeOutcome::failure(sequence, ProbeError::Timeout)
        }
    }

    let cfg = ProbeConfig {
        hop_limit: Some(12),
        payload_size: 8,
        read_timeout: Duration::from_millis(250),
        reply_filter: ReplyFilter::MatchIdentity,
    };
    let mut p = pinger(Some(2));
    p.set_probe_config(cfg.clone());
    let mut probe = ConfigProbe(vec![]);
    p.ping_with(&mut probe);
    assert_eq!(probe.0, vec![cfg.clone(), cfg]);
}
