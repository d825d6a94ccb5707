//! Turns user input into a concrete target address.

use crate::error::Error;
use crate::socket::SocketFamily;
use dns_lookup::{AddrFamily, AddrInfoHints};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr, SocketAddrV6};
use tracing::debug;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A resolved target. Immutable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetAddress {
    ip: IpAddr,
    family: SocketFamily,
    /// IPv6 zone index; zero when unscoped.
    scope_id: u32,
}

impl TargetAddress {
    pub fn new(ip: IpAddr) -> Self {
        let ip = canonical(ip);
        TargetAddress {
            ip,
            family: SocketFamily::from_ip(&ip),
            scope_id: 0,
        }
    }

    /// An IPv6 address reached through the interface with index `scope_id`.
    pub fn scoped(ip: Ipv6Addr, scope_id: u32) -> Self {
        let target = TargetAddress::new(IpAddr::V6(ip));
        match target.family {
            SocketFamily::Ipv6 => TargetAddress { scope_id, ..target },
            SocketFamily::Ipv4 => target,
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn family(&self) -> SocketFamily {
        self.family
    }

    pub fn scope_id(&self) -> u32 {
        self.scope_id
    }

    /// Destination for `sendto`, carrying the scope id for IPv6.
    pub fn socket_addr(&self) -> SocketAddr {
        match self.ip {
            IpAddr::V6(v6) => SocketAddr::V6(SocketAddrV6::new(v6, 0, 0, self.scope_id)),
            v4 => SocketAddr::new(v4, 0),
        }
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ip, f)?;
        if self.scope_id != 0 {
            write!(f, "%{}", self.scope_id)?;
        }
        Ok(())
    }
}

/// IPv4-mapped IPv6 addresses are reached over IPv4.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        v4 => v4,
    }
}

/// Resolves a literal IP address or a hostname.
///
/// Hostnames are looked up as IPv6 first and fall back to IPv4.
pub fn resolve(input: &str) -> Result<TargetAddress, Error> {
    if let Ok(ip) = input.parse::<IpAddr>() {
        let target = TargetAddress::new(ip);
        debug!(%input, dst = %target, "parsed literal address");
        return Ok(target);
    }
    if let Some((addr, zone)) = split_zone(input) {
        return resolve_zoned(input, addr, zone);
    }

    if !is_valid_hostname(input) {
        return Err(Error::InvalidHostname(input.to_string()));
    }

    let v6_err = match lookup(input, SocketFamily::Ipv6) {
        Ok(ip) => return Ok(TargetAddress::new(ip)),
        Err(e) => e,
    };
    debug!(host = %input, error = %v6_err, "no IPv6 address, trying IPv4");

    lookup(input, SocketFamily::Ipv4)
        .map(TargetAddress::new)
        .map_err(|source| Error::Resolution {
            host: input.to_string(),
            source,
        })
}

/// Splits `addr%zone` when `addr` is an IPv6 literal.
fn split_zone(input: &str) -> Option<(Ipv6Addr, &str)> {
    let (addr, zone) = input.split_once('%')?;
    addr.parse().ok().map(|addr| (addr, zone))
}

/// Resolves a zoned IPv6 literal. The zone is an interface index or name.
fn resolve_zoned(input: &str, addr: Ipv6Addr, zone: &str) -> Result<TargetAddress, Error> {
    if zone.is_empty() {
        return Err(Error::InvalidHostname(input.to_string()));
    }
    let scope_id = match zone.parse::<u32>() {
        Ok(index) => index,
        // getaddrinfo maps interface names to indexes without a DNS query.
        Err(_) => match lookup_addr(input, SocketFamily::Ipv6) {
            Ok(SocketAddr::V6(sa)) => sa.scope_id(),
            Ok(SocketAddr::V4(_)) => 0,
            Err(source) => {
                return Err(Error::Resolution {
                    host: input.to_string(),
                    source,
                })
            }
        },
    };
    let target = TargetAddress::scoped(addr, scope_id);
    debug!(%input, dst = %target, "parsed zoned literal");
    Ok(target)
}

fn lookup(host: &str, family: SocketFamily) -> io::Result<IpAddr> {
    lookup_addr(host, family).map(|sa| sa.ip())
}

fn lookup_addr(host: &str, family: SocketFamily) -> io::Result<SocketAddr> {
    let address = match family {
        SocketFamily::Ipv4 => AddrFamily::Inet,
        SocketFamily::Ipv6 => AddrFamily::Inet6,
    };
    let hints = AddrInfoHints {
        address: address.into(),
        ..AddrInfoHints::default()
    };
    let addrs = dns_lookup::getaddrinfo(Some(host), None, Some(hints)).map_err(io::Error::from)?;
    for info in addrs {
        let sockaddr = info?.sockaddr;
        if SocketFamily::from_ip(&sockaddr.ip()) == family {
            debug!(%host, ip = %sockaddr.ip(), "resolved");
            return Ok(sockaddr);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no {:?} address for {}", family, host),
    ))
}

/// RFC 1123 host name syntax, with `_` tolerated as many resolvers do.
fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > MAX_HOSTNAME_LEN {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}
