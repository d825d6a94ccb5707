use super::SocketFamily;
use socket2::{SockAddr, Socket, Type};
use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket as StdUdpSocket};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct IcmpConfig {
    pub family: SocketFamily,
    pub bind: Option<SocketAddr>,
    pub ttl: Option<u32>,
    pub hop_limit: Option<u32>,
}

impl IcmpConfig {
    /// Config for a socket bound to the wildcard address of `family`.
    pub fn new(family: SocketFamily) -> Self {
        Self {
            family,
            bind: Some(SocketAddr::new(family.wildcard(), 0)),
            ttl: None,
            hop_limit: None,
        }
    }

    /// Applies a hop limit through the option that matches the family.
    pub fn with_hop_limit(mut self, hops: Option<u8>) -> Self {
        match (self.family, hops) {
            (SocketFamily::Ipv4, Some(h)) => self.ttl = Some(h as u32),
            (SocketFamily::Ipv6, Some(h)) => self.hop_limit = Some(h as u32),
            (_, None) => {}
        }
        self
    }
}

/// Blocking raw ICMP socket. Closed when dropped.
#[derive(Debug)]
pub struct IcmpSocket {
    inner: StdUdpSocket,
}

impl IcmpSocket {
    pub fn open(config: &IcmpConfig) -> io::Result<Self> {
        let socket = Socket::new(
            config.family.to_domain(),
            Type::RAW,
            Some(config.family.to_protocol()),
        )?;

        if let Some(bind) = config.bind {
            socket.bind(&SockAddr::from(bind))?;
        }
        if let Some(ttl) = config.ttl {
            socket.set_ttl(ttl)?;
        }
        if let Some(hop_limit) = config.hop_limit {
            socket.set_unicast_hops_v6(hop_limit)?;
        }

        Ok(Self {
            inner: socket.into(),
        })
    }

    /// Sends one message. The port of `target` is ignored by raw sockets;
    /// an IPv6 scope id selects the outgoing link.
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.inner.send_to(buf, target)
    }

    /// Bounds the next reads by `deadline`. A deadline already in the past
    /// is reported as `TimedOut`.
    pub fn set_read_deadline(&self, deadline: Instant) -> io::Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::ZERO {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "read deadline elapsed",
            ));
        }
        self.inner.set_read_timeout(Some(remaining))
    }

    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, IpAddr)> {
        let (len, addr) = self.inner.recv_from(buf)?;
        Ok((len, addr.ip()))
    }
}

/// Whether a receive error means the read deadline passed.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_binds_wildcard() {
        let cfg = IcmpConfig::new(SocketFamily::Ipv6);
        assert_eq!(cfg.bind, Some("[::]:0".parse().unwrap()));
        assert_eq!(cfg.ttl, None);
        assert_eq!(cfg.hop_limit, None);
    }

    #[test]
    fn test_hop_limit_uses_family_option() {
        let v4 = IcmpConfig::new(SocketFamily::Ipv4).with_hop_limit(Some(7));
        assert_eq!(v4.ttl, Some(7));
        assert_eq!(v4.hop_limit, None);

        let v6 = IcmpConfig::new(SocketFamily::Ipv6).with_hop_limit(Some(9));
        assert_eq!(v6.ttl, None);
        assert_eq!(v6.hop_limit, Some(9));

        let unset = IcmpConfig::new(SocketFamily::Ipv4).with_hop_limit(None);
        assert_eq!(unset.ttl, None);
    }

    #[test]
    fn test_timeout_kinds() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
