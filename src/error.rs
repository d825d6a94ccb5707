//! Error types.
//!
//! [`Error`] covers the conditions that stop a session before it starts.
//! Per-probe failures live in [`crate::ping::ProbeError`] and never abort
//! the loop.

use thiserror::Error;

/// Fatal, pre-loop errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Invalid hostname {0:?}")]
    InvalidHostname(String),

    #[error("Failed to resolve hostname {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns true for errors caused by bad command-line input.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Argument(_))
    }
}
