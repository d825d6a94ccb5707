use crate::packet::{self, MessageKind, PacketError, ECHO_HEADER_LEN};
use crate::resolve::TargetAddress;
use crate::socket::icmp::{self, IcmpConfig, IcmpSocket};
use crate::socket::SocketFamily;
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Payload bytes per echo request when none is configured.
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
/// How long a probe waits for its reply when none is configured.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

const MTU: usize = 1500;
const MAX_IPV4_HEADER_LEN: usize = 60;
/// Longest wait honoured for a single reply (about 136 years).
const MAX_READ_TIMEOUT: Duration = Duration::from_secs(u32::MAX as u64);

/// How the prober decides which inbound datagram is its reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplyFilter {
    /// Read exactly one datagram and classify it. Unrelated ICMP traffic
    /// arriving first is counted as no reply.
    #[default]
    FirstDatagram,
    /// Skip datagrams that are not an echo reply carrying this session's
    /// identifier and the probe's sequence, until the read deadline.
    MatchIdentity,
}

/// Per-probe settings, fixed for a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Outgoing TTL / hop limit. `None` keeps the platform default.
    pub hop_limit: Option<u8>,
    /// Echo data length in bytes.
    pub payload_size: usize,
    /// Time allowed for the reply, measured from the end of the send.
    pub read_timeout: Duration,
    pub reply_filter: ReplyFilter,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            hop_limit: None,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            reply_filter: ReplyFilter::default(),
        }
    }
}

/// Why a single probe failed. None of these stop the session.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to open ICMP socket: {0}")]
    Transport(#[source] io::Error),

    #[error("Failed to send echo request: {0}")]
    Send(#[source] io::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to receive reply: {0}")]
    Receive(#[source] io::Error),

    #[error("Failed to build echo request: {0}")]
    Encode(#[source] PacketError),

    #[error("Failed to parse reply: {0}")]
    Parse(#[source] PacketError),
}

/// Result of one echo request/reply exchange.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub sequence: u16,
    pub succeeded: bool,
    /// Zero unless the probe succeeded.
    pub round_trip_time: Duration,
    pub failure: Option<ProbeError>,
    /// Size of the ICMP reply message in bytes.
    pub reply_size: usize,
    pub peer: Option<IpAddr>,
    /// Type of the datagram that was read, if one was.
    pub reply_kind: Option<MessageKind>,
}

impl ProbeOutcome {
    pub fn success(sequence: u16, rtt: Duration, reply_size: usize, peer: IpAddr) -> Self {
        ProbeOutcome {
            sequence,
            succeeded: true,
            round_trip_time: rtt,
            failure: None,
            reply_size,
            peer: Some(peer),
            reply_kind: Some(MessageKind::EchoReply),
        }
    }

    pub fn failure(sequence: u16, err: ProbeError) -> Self {
        ProbeOutcome {
            sequence,
            succeeded: false,
            round_trip_time: Duration::ZERO,
            failure: Some(err),
            reply_size: 0,
            peer: None,
            reply_kind: None,
        }
    }

    /// A reply arrived but was not an echo reply. Counts as lost, without
    /// an error.
    pub fn inconclusive(sequence: u16, kind: MessageKind, reply_size: usize, peer: IpAddr) -> Self {
        ProbeOutcome {
            sequence,
            succeeded: false,
            round_trip_time: Duration::ZERO,
            failure: None,
            reply_size,
            peer: Some(peer),
            reply_kind: Some(kind),
        }
    }
}

/// One round of the echo protocol against a target.
///
/// Implementations report every failure through the returned outcome.
pub trait Probe {
    fn probe(
        &mut self,
        target: &TargetAddress,
        cfg: &ProbeConfig,
        identifier: u16,
        sequence: u16,
    ) -> ProbeOutcome;
}

/// Echo identifier shared by every probe of this process.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Probes over a raw ICMP socket opened and closed per call.
#[derive(Debug, Default)]
pub struct EchoProber {
    recv_buf: Vec<u8>,
}

impl EchoProber {
    pub fn new() -> Self {
        Self::default()
    }

    fn exchange(
        &mut self,
        target: &TargetAddress,
        cfg: &ProbeConfig,
        identifier: u16,
        sequence: u16,
    ) -> Result<ProbeOutcome, ProbeError> {
        let family = target.family();
        let socket_cfg = IcmpConfig::new(family).with_hop_limit(cfg.hop_limit);
        let socket = IcmpSocket::open(&socket_cfg).map_err(ProbeError::Transport)?;

        let request = packet::build_echo_request(family, identifier, sequence, cfg.payload_size)
            .map_err(ProbeError::Encode)?;

        let buf_len = MTU.max(ECHO_HEADER_LEN + cfg.payload_size + MAX_IPV4_HEADER_LEN);
        self.recv_buf.resize(buf_len, 0);

        let start_time = Instant::now();
        socket
            .send_to(&request, target.socket_addr())
            .map_err(ProbeError::Send)?;
        let deadline = read_deadline(Instant::now(), cfg.read_timeout);

        loop {
            socket.set_read_deadline(deadline).map_err(receive_error)?;
            let (bytes_len, peer) = socket
                .recv_from(&mut self.recv_buf)
                .map_err(receive_error)?;
            let rtt = Instant::now().duration_since(start_time);
            let reply = Reply {
                datagram: &self.recv_buf[..bytes_len],
                rtt,
                peer,
            };
            let filter = cfg.reply_filter;
            if let Some(outcome) = reply_outcome(filter, family, identifier, sequence, reply) {
                return outcome;
            }
        }
    }
}

/// A datagram read back after the request was sent.
#[derive(Debug, Clone, Copy)]
struct Reply<'a> {
    datagram: &'a [u8],
    rtt: Duration,
    peer: IpAddr,
}

/// Classifies one received datagram. `None` means keep reading.
fn reply_outcome(
    filter: ReplyFilter,
    family: SocketFamily,
    identifier: u16,
    sequence: u16,
    reply: Reply<'_>,
) -> Option<Result<ProbeOutcome, ProbeError>> {
    let peer = reply.peer;
    let parsed = packet::icmp_message(family, reply.datagram).and_then(|icmp| {
        packet::parse_message(family, icmp).map(|message| (message, icmp.len()))
    });

    let (message, reply_size) = match (filter, parsed) {
        (ReplyFilter::FirstDatagram, Ok(parsed)) => parsed,
        (ReplyFilter::FirstDatagram, Err(e)) => return Some(Err(ProbeError::Parse(e))),
        (ReplyFilter::MatchIdentity, Ok((m, len))) if m.answers(identifier, sequence) => (m, len),
        (ReplyFilter::MatchIdentity, other) => {
            trace!(%peer, seq = sequence, reply = ?other, "skipping unrelated datagram");
            return None;
        }
    };

    Some(Ok(match message.kind {
        MessageKind::EchoReply => ProbeOutcome::success(sequence, reply.rtt, reply_size, peer),
        kind => ProbeOutcome::inconclusive(sequence, kind, reply_size, peer),
    }))
}

/// End of the reply window. Timeouts too large for the clock are capped.
fn read_deadline(now: Instant, read_timeout: Duration) -> Instant {
    now.checked_add(read_timeout.min(MAX_READ_TIMEOUT))
        .or_else(|| now.checked_add(DEFAULT_READ_TIMEOUT))
        .unwrap_or(now)
}

impl Probe for EchoProber {
    fn probe(
        &mut self,
        target: &TargetAddress,
        cfg: &ProbeConfig,
        identifier: u16,
        sequence: u16,
    ) -> ProbeOutcome {
        match self.exchange(target, cfg, identifier, sequence) {
            Ok(outcome) => {
                debug!(
                    dst = %target,
                    seq = sequence,
                    succeeded = outcome.succeeded,
                    rtt = ?outcome.round_trip_time,
                    kind = ?outcome.reply_kind,
                    "probe finished"
                );
                outcome
            }
            Err(e) => {
                debug!(dst = %target, seq = sequence, error = %e, "probe failed");
                ProbeOutcome::failure(sequence, e)
            }
        }
    }
}

fn receive_error(err: io::Error) -> ProbeError {
    if icmp::is_timeout(&err) {
        ProbeError::Timeout
    } else {
        ProbeError::Receive(err)
    }
}
