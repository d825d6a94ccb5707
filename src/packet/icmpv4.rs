use super::{EchoBody, IcmpMessage, MessageKind, PacketError, ICMP_HEADER_LEN, IPV4_HEADER_LEN};
use pnet_packet::icmp::{IcmpCode, IcmpPacket, IcmpType, IcmpTypes, MutableIcmpPacket};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::{MutablePacket, Packet};

pub fn build_echo_request(
    buf: &mut [u8],
    identifier: u16,
    sequence: u16,
) -> Result<(), PacketError> {
    let actual = buf.len();
    let mut icmp_packet = MutableIcmpPacket::new(buf).ok_or(PacketError::TooShort {
        layer: "ICMP",
        expected: ICMP_HEADER_LEN,
        actual,
    })?;
    icmp_packet.set_icmp_type(IcmpTypes::EchoRequest);
    icmp_packet.set_icmp_code(IcmpCode::new(0));
    EchoBody::encode(icmp_packet.payload_mut(), identifier, sequence);
    let icmp_checksum = pnet_packet::util::checksum(icmp_packet.packet(), 1);
    icmp_packet.set_checksum(icmp_checksum);
    Ok(())
}

fn classify(icmp_type: IcmpType) -> MessageKind {
    match icmp_type {
        IcmpTypes::EchoRequest => MessageKind::EchoRequest,
        IcmpTypes::EchoReply => MessageKind::EchoReply,
        IcmpTypes::DestinationUnreachable => MessageKind::DestinationUnreachable,
        IcmpTypes::TimeExceeded => MessageKind::TimeExceeded,
        other => MessageKind::Other(other.0),
    }
}

pub fn parse(bytes: &[u8]) -> Result<IcmpMessage, PacketError> {
    let icmp = IcmpPacket::new(bytes).ok_or(PacketError::TooShort {
        layer: "ICMP",
        expected: ICMP_HEADER_LEN,
        actual: bytes.len(),
    })?;
    let kind = classify(icmp.get_icmp_type());
    let echo = if kind.is_echo() {
        Some(EchoBody::decode(icmp.payload())?)
    } else {
        None
    };
    Ok(IcmpMessage {
        kind,
        code: icmp.get_icmp_code().0,
        echo,
    })
}

/// Returns the ICMP message that follows the IPv4 header.
pub fn strip_ipv4_header(datagram: &[u8]) -> Result<&[u8], PacketError> {
    let packet = Ipv4Packet::new(datagram).ok_or(PacketError::TooShort {
        layer: "IPv4",
        expected: IPV4_HEADER_LEN,
        actual: datagram.len(),
    })?;
    if packet.get_version() != 4 {
        return Err(PacketError::Malformed(format!(
            "IP version {} in IPv4 datagram",
            packet.get_version()
        )));
    }
    // IHL counts 32-bit words. Some stacks rewrite total_length on raw
    // reads, so slice by IHL rather than trusting Ipv4Packet::payload.
    let header_len = packet.get_header_length() as usize * 4;
    if header_len < IPV4_HEADER_LEN || header_len > datagram.len() {
        return Err(PacketError::Malformed(format!(
            "IPv4 header length {} for a {} byte datagram",
            header_len,
            datagram.len()
        )));
    }
    Ok(&datagram[header_len..])
}
