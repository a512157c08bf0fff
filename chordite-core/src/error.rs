//! Core error taxonomy.
//!
//! Mirrors the kinds in the error-handling design: transient remote
//! failures, routing failures, not-found, invalid input, and local
//! resource exhaustion. Background maintenance swallows these and retries
//! on the next tick; client-initiated calls propagate them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The remote peer did not answer within `T_net`, or the connection
    /// could not be established. Caller may retry via an alternate hop.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    /// `find_successor` could not resolve within `K_hops`. The caller
    /// receives the best-known successor instead of an error in most
    /// call sites; this variant is for callers that need to distinguish
    /// a degraded answer from a confirmed one.
    #[error("routing did not converge within {hops} hops")]
    RoutingFailure { hops: u32 },

    /// File or posting absent on the queried owner.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request: bad opcode, out-of-range id, missing field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The bootstrap registry was unreachable during `join`.
    #[error("bootstrap registry unreachable: {0}")]
    BootstrapUnreachable(String),

    /// Local resource exhaustion: worker pool full, queue full.
    #[error("local resource exhausted: {0}")]
    ResourceExhausted(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Errors raised during background maintenance should be logged and
    /// swallowed rather than surfaced; this distinguishes those from
    /// errors a client-initiated call must propagate.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::PeerUnreachable(_) | Self::RoutingFailure { .. } | Self::BootstrapUnreachable(_)
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
