//! ICMP echo reachability probe.
//!
//! Resolve a target once with [`resolve`], then drive a [`ping::Pinger`]
//! session against it. Each tick sends one echo request over a fresh raw
//! socket and folds the outcome into [`ping::SessionStats`].

pub mod config;
pub mod error;
pub mod packet;
pub mod ping;
pub mod resolve;
pub mod socket;

pub use error::Error;
pub use resolve::{resolve, TargetAddress};
pub use socket::SocketFamily;
