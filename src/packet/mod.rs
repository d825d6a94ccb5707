//! ICMP and ICMPv6 echo framing.
//!
//! Both families share the echo layout of RFC 792 / RFC 4443:
//!
//! ```text
//!  0               1               2               3
//! +---------------+---------------+-------------------------------+
//! |     Type      |     Code      |           Checksum            |
//! +---------------+---------------+-------------------------------+
//! |           Identifier          |        Sequence Number        |
//! +-------------------------------+-------------------------------+
//! |     Data ...
//! ```

mod icmpv4;
mod icmpv6;

use crate::socket::SocketFamily;
use thiserror::Error;

/// Type, code and checksum.
pub const ICMP_HEADER_LEN: usize = 4;
/// ICMP header plus identifier and sequence number.
pub const ECHO_HEADER_LEN: usize = 8;
pub const IPV4_HEADER_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("{layer} packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed packet: {0}")]
    Malformed(String),
}

/// Message types a prober cares about, per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    EchoRequest,
    EchoReply,
    DestinationUnreachable,
    TimeExceeded,
    Other(u8),
}

impl MessageKind {
    pub fn is_echo(&self) -> bool {
        matches!(self, MessageKind::EchoRequest | MessageKind::EchoReply)
    }
}

/// Identifier, sequence number and data of an echo message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoBody {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoBody {
    /// Decodes the part of an echo message that follows the ICMP header.
    fn decode(rest: &[u8]) -> Result<Self, PacketError> {
        let fields = ECHO_HEADER_LEN - ICMP_HEADER_LEN;
        if rest.len() < fields {
            return Err(PacketError::TooShort {
                layer: "echo",
                expected: ECHO_HEADER_LEN,
                actual: rest.len() + ICMP_HEADER_LEN,
            });
        }
        Ok(EchoBody {
            identifier: u16::from_be_bytes([rest[0], rest[1]]),
            sequence: u16::from_be_bytes([rest[2], rest[3]]),
            payload: rest[fields..].to_vec(),
        })
    }

    fn encode(rest: &mut [u8], identifier: u16, sequence: u16) {
        rest[0..2].copy_from_slice(&identifier.to_be_bytes());
        rest[2..4].copy_from_slice(&sequence.to_be_bytes());
    }
}

/// A decoded ICMP or ICMPv6 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub kind: MessageKind,
    pub code: u8,
    /// Present for echo requests and replies.
    pub echo: Option<EchoBody>,
}

impl IcmpMessage {
    /// Whether this is an echo reply to `identifier`/`sequence`.
    pub fn answers(&self, identifier: u16, sequence: u16) -> bool {
        match (&self.kind, &self.echo) {
            (MessageKind::EchoReply, Some(echo)) => {
                echo.identifier == identifier && echo.sequence == sequence
            }
            _ => false,
        }
    }
}

/// Serializes an echo request carrying `payload_size` zero bytes.
///
/// The ICMPv4 checksum is filled in here. The ICMPv6 checksum covers a
/// pseudo-header with the source address, so it is left zero for the
/// kernel to compute on send.
pub fn build_echo_request(
    family: SocketFamily,
    identifier: u16,
    sequence: u16,
    payload_size: usize,
) -> Result<Vec<u8>, PacketError> {
    let mut buf = vec![0u8; ECHO_HEADER_LEN + payload_size];
    match family {
        SocketFamily::Ipv4 => icmpv4::build_echo_request(&mut buf, identifier, sequence)?,
        SocketFamily::Ipv6 => icmpv6::build_echo_request(&mut buf, identifier, sequence)?,
    }
    Ok(buf)
}

/// Parses a bare ICMP message of the given family.
pub fn parse_message(family: SocketFamily, bytes: &[u8]) -> Result<IcmpMessage, PacketError> {
    match family {
        SocketFamily::Ipv4 => icmpv4::parse(bytes),
        SocketFamily::Ipv6 => icmpv6::parse(bytes),
    }
}

/// Returns the ICMP message inside a datagram read from a raw socket.
///
/// IPv4 raw sockets deliver the IP header in front of the message; IPv6
/// raw sockets deliver the ICMPv6 message alone.
pub fn icmp_message(family: SocketFamily, datagram: &[u8]) -> Result<&[u8], PacketError> {
    match family {
        SocketFamily::Ipv4 => icmpv4::strip_ipv4_header(datagram),
        SocketFamily::Ipv6 => Ok(datagram),
    }
}

/// Parses a datagram read from a raw ICMP socket.
pub fn parse_reply(family: SocketFamily, datagram: &[u8]) -> Result<IcmpMessage, PacketError> {
    parse_message(family, icmp_message(family, datagram)?)
}
