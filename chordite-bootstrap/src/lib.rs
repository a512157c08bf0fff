//! Chordite Bootstrap Registry
//!
//! A process-wide, advisory directory new peers use to discover a seed
//! (§4.C). The registry owns no DHT content, only membership metadata,
//! and is liveness-pruned by a periodic sweep rather than a push-based
//! event channel — generalized from the teacher crate's
//! `monocoque-core/src/monitor.rs` event idea to a pull model, because
//! the registry must tolerate a peer that died before ever completing a
//! heartbeat.

#![deny(unsafe_code)]

pub mod handler;
pub mod registry;

pub mod prelude {
    pub use crate::handler::RegistryHandler;
    pub use crate::registry::{RegisterOutcome, Registry, RegistryConfig};
}
