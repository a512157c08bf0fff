//! Peer reference: an immutable `(id, host, port)` triple.

use crate::id::{Id, IdSpace};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A reference to a peer on the ring.
///
/// Equality and ordering are by `id` only, per the data model: two peers
/// never legitimately share an id, so the host/port are descriptive, not
/// part of identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub id: Id,
    pub host: String,
    pub port: u16,
}

impl Peer {
    /// Derive a peer's id from `host:port`, as `hash(host || ":" || port)`.
    #[must_use]
    pub fn new(space: IdSpace, host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let id = space.hash_str(&format!("{host}:{port}"));
        Self { id, host, port }
    }

    /// Construct a peer with a pre-computed id (used by transports
    /// deserializing a peer reference off the wire).
    #[must_use]
    pub const fn with_id(id: Id, host: String, port: u16) -> Self {
        Self { id, host, port }
    }

    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Peer {}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({}, {}:{})", self.id, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_host_port() {
        let space = IdSpace::new(16);
        let a = Peer::with_id(space.wrap(42), "a.example".into(), 1);
        let b = Peer::with_id(space.wrap(42), "b.example".into(), 2);
        assert_eq!(a, b);
    }

    #[test]
    fn derived_id_is_stable() {
        let space = IdSpace::new(16);
        let a = Peer::new(space, "127.0.0.1", 9000);
        let b = Peer::new(space, "127.0.0.1", 9000);
        assert_eq!(a.id, b.id);
    }
}
