//! `ping-cli`: tests reachability of a host by sending it ICMP echo requests.

use clap::Parser;
use pingcli::config;
use pingcli::ping::{PingProgress, PingResult, Pinger, ProbeConfig, ReplyFilter};
use pingcli::{resolve, Error, TargetAddress};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const USAGE_EXIT_STATUS: u8 = 2;

/// Tests reachability of a host by sending it ICMP echo requests.
#[derive(Parser, Debug)]
#[command(name = "ping-cli")]
#[command(version)]
#[command(override_usage = "ping-cli [OPTIONS] <HOST>")]
pub struct Args {
    /// Hostname or IP address to ping.
    pub host: String,

    /// Time to live (1-255, or "infinity" for the system default).
    #[arg(short, long, default_value = config::INFINITY, allow_hyphen_values = true)]
    pub ttl: String,

    /// Number of pings ("infinity" to run until interrupted).
    #[arg(short, long, default_value = config::INFINITY, allow_hyphen_values = true)]
    pub count: String,

    /// Number of data bytes to send.
    #[arg(short = 's', long = "packetsize", default_value_t = 56, allow_negative_numbers = true)]
    pub packet_size: i64,

    /// Seconds to wait for each reply.
    #[arg(short = 'W', long, default_value_t = 2.0)]
    pub timeout: f64,

    /// Seconds between pings.
    #[arg(short, long, default_value_t = 1.0)]
    pub interval: f64,

    /// Only accept echo replies carrying this session's identifier and sequence.
    ///
    /// Needed to ping loopback on Linux: without it the first datagram read
    /// is our own echo request and every ping counts as lost.
    #[arg(long = "match-id")]
    pub match_id: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn to_probe_config(&self) -> Result<ProbeConfig, Error> {
        Ok(ProbeConfig {
            hop_limit: config::hop_limit(&self.ttl)?,
            payload_size: config::payload_size(self.packet_size),
            read_timeout: positive_seconds("--timeout", self.timeout)?,
            reply_filter: if self.match_id {
                ReplyFilter::MatchIdentity
            } else {
                ReplyFilter::FirstDatagram
            },
        })
    }
}

fn seconds(flag: &str, value: f64) -> Result<Duration, Error> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        Error::Argument(format!("{flag} must be a number of seconds, got {value}"))
    })
}

fn positive_seconds(flag: &str, value: f64) -> Result<Duration, Error> {
    match seconds(flag, value)? {
        d if d.is_zero() => Err(Error::Argument(format!("{flag} must be greater than zero"))),
        d => Ok(d),
    }
}

/// Log filter used when `RUST_LOG` is unset.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Usage errors exit with 2, like clap's own parse errors.
fn exit_status(err: &Error) -> u8 {
    if err.is_usage() {
        USAGE_EXIT_STATUS
    } else {
        1
    }
}

fn build_pinger(args: &Args) -> Result<Pinger, Error> {
    let probe_config = args.to_probe_config()?;
    let probe_count = config::probe_count(&args.count)?;
    let send_interval = seconds("--interval", args.interval)?;
    let target = resolve(&args.host)?;

    let mut pinger = Pinger::new(target);
    pinger.set_probe_config(probe_config);
    pinger.set_probe_count(probe_count);
    pinger.set_send_interval(send_interval);
    Ok(pinger)
}

fn print_progress(progress: &PingProgress) {
    let outcome = &progress.outcome;
    if outcome.succeeded {
        if let Some(peer) = outcome.peer {
            println!(
                "Reply from {}: bytes={} time={}ms",
                peer,
                outcome.reply_size,
                outcome.round_trip_time.as_millis()
            );
        }
    } else if let Some(err) = &outcome.failure {
        println!("{}", err);
    }
    println!("Packet Loss: {:.2}%", progress.stats.loss_percent());
}

fn print_summary(target: &TargetAddress, result: &PingResult) {
    let stats = &result.stats;
    let mean = stats.mean_rtt().unwrap_or_default();
    println!("Ping statistics for {}:", target);
    println!(
        "\tPackets: Sent = {}, Received = {}, Lost = {} ({:.2}% loss),",
        stats.sent,
        stats.received,
        stats.lost(),
        stats.loss_percent()
    );
    println!("Approximate round trip times in milli-seconds:");
    println!(
        "\tMinimum = {}ms, Maximum = {}ms, Average = {}ms",
        stats.min_rtt.as_millis(),
        stats.max_rtt.as_millis(),
        mean.as_millis()
    );
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(args.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    let pinger = match build_pinger(&args) {
        Ok(pinger) => pinger,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(exit_status(&e));
        }
    };
    let target = pinger.get_target();

    let stop = pinger.get_stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    println!(
        "Pinging {} with {} bytes of data:",
        target,
        pinger.get_probe_config().payload_size
    );

    let rx = pinger.get_progress_receiver();
    let handle = thread::spawn(move || pinger.ping());
    if let Ok(rx) = rx.lock() {
        for progress in rx.iter() {
            print_progress(&progress);
        }
    }

    match handle.join() {
        Ok(result) => {
            print_summary(&target, &result);
            ExitCode::SUCCESS
        }
        Err(_) => {
            eprintln!("Error: ping session panicked");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_exactly_one_host() {
        assert!(Args::try_parse_from(["ping-cli"]).is_err());
        assert!(Args::try_parse_from(["ping-cli", "a", "b"]).is_err());
        assert!(Args::try_parse_from(["ping-cli", "127.0.0.1"]).is_ok());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["ping-cli", "127.0.0.1"]).unwrap();
        let cfg = args.to_probe_config().unwrap();
        assert_eq!(cfg.hop_limit, None);
        assert_eq!(cfg.payload_size, 56);
        assert_eq!(cfg.read_timeout, Duration::from_secs(2));
        assert_eq!(cfg.reply_filter, ReplyFilter::FirstDatagram);
        assert_eq!(config::probe_count(&args.count).unwrap(), None);
    }

    #[test]
    fn test_short_flags() {
        let args = Args::try_parse_from([
            "ping-cli", "-t", "300", "-c", "3", "-s", "-1", "--match-id", "::1",
        ])
        .unwrap();
        let cfg = args.to_probe_config().unwrap();
        assert_eq!(cfg.hop_limit, None);
        assert_eq!(cfg.payload_size, 56);
        assert_eq!(cfg.reply_filter, ReplyFilter::MatchIdentity);
        assert_eq!(config::probe_count(&args.count).unwrap(), Some(3));

        let pinger = build_pinger(&args).unwrap();
        assert_eq!(pinger.get_probe_count(), Some(3));
        assert_eq!(pinger.get_target().to_string(), "::1");
    }

    #[test]
    fn test_invalid_values() {
        let args = Args::try_parse_from(["ping-cli", "--ttl", "lots", "127.0.0.1"]).unwrap();
        assert!(build_pinger(&args).unwrap_err().is_usage());

        let args = Args::try_parse_from(["ping-cli", "-W", "0", "127.0.0.1"]).unwrap();
        assert!(build_pinger(&args).unwrap_err().is_usage());

        let args = Args::try_parse_from(["ping-cli", ""]).unwrap();
        assert!(matches!(build_pinger(&args), Err(Error::InvalidHostname(_))));
    }

    #[test]
    fn test_exit_status_by_error_kind() {
        let usage = Error::Argument("bad ttl".into());
        assert_eq!(exit_status(&usage), 2);
        let host = Error::InvalidHostname("a..b".into());
        assert_eq!(exit_status(&host), 1);
    }

    #[test]
    fn test_default_log_filter() {
        assert_eq!(default_log_filter(false), "warn");
        assert_eq!(default_log_filter(true), "debug");
    }

    #[test]
    fn test_huge_timeout_is_accepted() {
        let args = Args::try_parse_from(["ping-cli", "-W", "1e19", "127.0.0.1"]).unwrap();
        let cfg = args.to_probe_config().unwrap();
        assert!(cfg.read_timeout > Duration::from_secs(1_000_000));
    }

    #[test]
    fn test_match_id_help_mentions_loopback() {
        use clap::CommandFactory;
        let cmd = Args::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id().as_str() == "match_id")
            .unwrap();
        let help = arg.get_long_help().unwrap().to_string();
        assert!(help.contains("loopback"), "{help}");
    }
}
