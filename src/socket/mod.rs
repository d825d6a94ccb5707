pub mod icmp;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of a target and of the socket used to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketFamily {
    Ipv4,
    Ipv6,
}

impl SocketFamily {
    pub fn from_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => SocketFamily::Ipv4,
            IpAddr::V6(_) => SocketFamily::Ipv6,
        }
    }

    pub fn to_domain(&self) -> socket2::Domain {
        match self {
            SocketFamily::Ipv4 => socket2::Domain::IPV4,
            SocketFamily::Ipv6 => socket2::Domain::IPV6,
        }
    }

    pub fn to_protocol(&self) -> socket2::Protocol {
        match self {
            SocketFamily::Ipv4 => socket2::Protocol::ICMPV4,
            SocketFamily::Ipv6 => socket2::Protocol::ICMPV6,
        }
    }

    /// The unspecified address (`0.0.0.0` or `::`).
    pub fn wildcard(&self) -> IpAddr {
        match self {
            SocketFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_ip() {
        assert_eq!(
            SocketFamily::from_ip(&"192.0.2.1".parse().unwrap()),
            SocketFamily::Ipv4
        );
        assert_eq!(
            SocketFamily::from_ip(&"2001:db8::1".parse().unwrap()),
            SocketFamily::Ipv6
        );
    }

    #[test]
    fn test_wildcard_matches_family() {
        assert_eq!(SocketFamily::Ipv4.wildcard().to_string(), "0.0.0.0");
        assert_eq!(SocketFamily::Ipv6.wildcard().to_string(), "::");
        assert_eq!(SocketFamily::Ipv4.to_protocol(), socket2::Protocol::ICMPV4);
        assert_eq!(SocketFamily::Ipv6.to_protocol(), socket2::Protocol::ICMPV6);
    }
}
