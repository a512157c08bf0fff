//! Chordite
//!
//! Peer process wiring on top of `chordite-core`'s ring logic and
//! `chordite-net`'s TCP transport: CLI configuration, the RPC request
//! handler, background maintenance loops, the bootstrap registry client,
//! composed error taxonomy, and the `put`/`get`/`search`/`join`/`leave`
//! client surface.

#![deny(unsafe_code)]

pub mod bootstrap_client;
pub mod config;
pub mod error;
pub mod handler;
pub mod peer;

pub mod prelude {
    pub use crate::bootstrap_client::BootstrapClient;
    pub use crate::config::PeerArgs;
    pub use crate::error::{ChorditeError, Result};
    pub use crate::handler::PeerRequestHandler;
    pub use crate::peer::{ChorditePeer, PeerStatus, SearchHit};
}
