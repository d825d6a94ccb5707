use super::{EchoBody, IcmpMessage, MessageKind, PacketError, ICMP_HEADER_LEN};
use pnet_packet::icmpv6::{Icmpv6Code, Icmpv6Packet, Icmpv6Type, Icmpv6Types, MutableIcmpv6Packet};
use pnet_packet::{MutablePacket, Packet};

pub fn build_echo_request(
    buf: &mut [u8],
    identifier: u16,
    sequence: u16,
) -> Result<(), PacketError> {
    let actual = buf.len();
    let mut icmp_packet = MutableIcmpv6Packet::new(buf).ok_or(PacketError::TooShort {
        layer: "ICMPv6",
        expected: ICMP_HEADER_LEN,
        actual,
    })?;
    icmp_packet.set_icmpv6_type(Icmpv6Types::EchoRequest);
    icmp_packet.set_icmpv6_code(Icmpv6Code::new(0));
    EchoBody::encode(icmp_packet.payload_mut(), identifier, sequence);
    icmp_packet.set_checksum(0);
    Ok(())
}

fn classify(icmpv6_type: Icmpv6Type) -> MessageKind {
    match icmpv6_type {
        Icmpv6Types::EchoRequest => MessageKind::EchoRequest,
        Icmpv6Types::EchoReply => MessageKind::EchoReply,
        Icmpv6Types::DestinationUnreachable => MessageKind::DestinationUnreachable,
        Icmpv6Types::TimeExceeded => MessageKind::TimeExceeded,
        other => MessageKind::Other(other.0),
    }
}

pub fn parse(bytes: &[u8]) -> Result<IcmpMessage, PacketError> {
    let icmp = Icmpv6Packet::new(bytes).ok_or(PacketError::TooShort {
        layer: "ICMPv6",
        expected: ICMP_HEADER_LEN,
        actual: bytes.len(),
    })?;
    let kind = classify(icmp.get_icmpv6_type());
    let echo = if kind.is_echo() {
        Some(EchoBody::decode(icmp.payload())?)
    } else {
        None
    };
    Ok(IcmpMessage {
        kind,
        code: icmp.get_icmpv6_code().0,
        echo,
    })
}
