//! Composed error type for the peer process, unifying the per-crate
//! taxonomies (§7) at the one boundary that actually needs all of them:
//! the client API surface (`put`/`get`/`search`/`join`/`leave`/`status`).
//! Background maintenance never surfaces this — it logs and self-heals
//! per the propagation rule in §7.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChorditeError {
    #[error(transparent)]
    Core(#[from] chordite_core::error::CoreError),

    #[error(transparent)]
    Net(#[from] chordite_net::error::NetError),

    #[error(transparent)]
    Wire(#[from] chordite_wire::codec::WireError),

    #[error("bootstrap registry returned: {0}")]
    Bootstrap(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ChorditeError>;

impl ChorditeError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_transient())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Core(e) if e.is_not_found())
    }
}
