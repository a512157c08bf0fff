//! Transport error taxonomy: the kinds a [`crate::client::TcpTransport`] or
//! [`crate::server::Listener`] can raise, distinct from `chordite-core`'s
//! taxonomy because these are IO/framing failures, not routing or
//! placement failures. `chordite-core::transport::Transport` callers
//! only ever see [`chordite_core::error::CoreError`] — the ring-wiring
//! layer (`chordite`) maps `NetError` onto it at the `Transport` impl
//! boundary.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    #[error("io error: {0}")]
    Io(#[source] io::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("wire error: {0}")]
    Wire(#[from] chordite_wire::codec::WireError),

    #[error("peer closed the connection before a complete frame arrived")]
    ConnectionClosed,

    #[error("dispatcher at capacity, request shed")]
    Busy,

    #[error("unexpected response variant for this request")]
    UnexpectedResponse,

    #[error("remote returned an error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, NetError>;
