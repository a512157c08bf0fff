//! Chordite Net
//!
//! TCP transport for the ring RPC and bootstrap registry contracts: a
//! connection-per-call [`client::TcpTransport`] implementing
//! `chordite_core::transport::Transport`, and a generic
//! [`server::Listener`] (bounded worker pool + dispatch queue) that both
//! `chordite`'s peer process and `chordite-bootstrap`'s registry process
//! build their request handling on top of.

#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod framing;
pub mod server;

/// Platform TCP socket tuning. Contains the one `unsafe` escape hatch in
/// this crate (raw-fd `setsockopt`), isolated behind `#![allow(unsafe_code)]`
/// at the module level rather than the crate level.
pub mod tcp;

pub mod prelude {
    pub use crate::client::TcpTransport;
    pub use crate::error::{NetError, Result};
    pub use crate::server::{Listener, RequestHandler};
}
