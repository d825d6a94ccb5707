//! Normalization of command-line option values.
//!
//! `--ttl` and `--count` accept an integer or the word `infinity`. Values
//! the probe cannot use are folded into "unset" rather than rejected.

use crate::error::Error;
use crate::ping::DEFAULT_PAYLOAD_SIZE;

/// Sentinel accepted by `--ttl` and `--count`.
pub const INFINITY: &str = "infinity";

fn parse_limit(flag: &str, value: &str) -> Result<Option<i64>, Error> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(INFINITY) {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| Error::Argument(format!("{flag} must be an integer or {INFINITY:?}, got {value:?}")))
}

/// Hop limit in 1..=255, or `None` for the platform default.
pub fn hop_limit(value: &str) -> Result<Option<u8>, Error> {
    Ok(parse_limit("--ttl", value)?.and_then(|ttl| u8::try_from(ttl).ok().filter(|&t| t > 0)))
}

/// Positive probe count, or `None` for unbounded.
pub fn probe_count(value: &str) -> Result<Option<u64>, Error> {
    Ok(parse_limit("--count", value)?.and_then(|count| u64::try_from(count).ok().filter(|&c| c > 0)))
}

/// Payload length; non-positive values fall back to the default.
pub fn payload_size(value: i64) -> usize {
    match usize::try_from(value) {
        Ok(size) if size > 0 => size,
        _ => DEFAULT_PAYLOAD_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_limit() {
        assert_eq!(hop_limit("infinity").unwrap(), None);
        assert_eq!(hop_limit("INFINITY").unwrap(), None);
        assert_eq!(hop_limit("1").unwrap(), Some(1));
        assert_eq!(hop_limit("255").unwrap(), Some(255));
        assert_eq!(hop_limit("0").unwrap(), None);
        assert_eq!(hop_limit("256").unwrap(), None);
        assert_eq!(hop_limit("-3").unwrap(), None);
        assert!(matches!(hop_limit("ten"), Err(Error::Argument(_))));
    }

    #[test]
    fn test_probe_count() {
        assert_eq!(probe_count("infinity").unwrap(), None);
        assert_eq!(probe_count("3").unwrap(), Some(3));
        assert_eq!(probe_count("0").unwrap(), None);
        assert_eq!(probe_count("-1").unwrap(), None);
        assert!(probe_count("").is_err());
    }

    #[test]
    fn test_payload_size() {
        assert_eq!(payload_size(100), 100);
        assert_eq!(payload_size(0), 56);
        assert_eq!(payload_size(-8), 56);
    }
}
