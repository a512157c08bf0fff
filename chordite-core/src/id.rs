//! Identifier space: m-bit ring arithmetic and hashing.
//!
//! Every node, file, and token lives in the same `[0, 2^m)` space. `Id`
//! carries no bit-width of its own — values are only ever produced by an
//! [`IdSpace`] of a known `m`, so they are always already reduced mod
//! `2^m` and ordinary integer comparison is enough for the wraparound
//! predicates below.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// A point in the ring's identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Id {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Default bit width used when a peer is not configured otherwise.
pub const DEFAULT_M: u32 = 16;

/// An m-bit identifier space: the hasher and the modulus all identifiers
/// in a given ring share.
#[derive(Debug, Clone, Copy)]
pub struct IdSpace {
    m: u32,
}

impl IdSpace {
    /// Construct a space of `m` bits. `m` must be in `1..=64`.
    #[must_use]
    pub fn new(m: u32) -> Self {
        assert!((1..=64).contains(&m), "m must be in 1..=64, got {m}");
        Self { m }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.m
    }

    /// `2^m`, as a `u128` to avoid overflow when `m == 64`.
    #[must_use]
    pub fn ring_size(self) -> u128 {
        1u128 << self.m
    }

    fn mask(self) -> u64 {
        if self.m == 64 {
            u64::MAX
        } else {
            (1u64 << self.m) - 1
        }
    }

    /// Deterministic `hash(bytes) -> Id`: SHA-1 truncated to the low `m`
    /// bits. Not a cryptographic boundary — only distribution matters.
    #[must_use]
    pub fn hash(self, bytes: &[u8]) -> Id {
        let digest = Sha1::digest(bytes);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest[0..8]);
        Id(u64::from_be_bytes(buf) & self.mask())
    }

    #[must_use]
    pub fn hash_str(self, s: &str) -> Id {
        self.hash(s.as_bytes())
    }

    /// `(id + 2^exponent) mod 2^m`, used to compute finger-table start
    /// points and bootstrap-client ids.
    #[must_use]
    pub fn add_pow2(self, id: Id, exponent: u32) -> Id {
        debug_assert!(exponent < self.m);
        let delta = 1u64 << exponent;
        Id(id.0.wrapping_add(delta) & self.mask())
    }

    /// Clamp a raw value into this space (used for tests / constructing
    /// synthetic ids).
    #[must_use]
    pub fn wrap(self, raw: u64) -> Id {
        Id(raw & self.mask())
    }
}

/// `x` lies strictly clockwise of `a` and strictly counter-clockwise of
/// `b`. `a == b` is defined as the empty interval.
#[must_use]
pub fn in_open(x: Id, a: Id, b: Id) -> bool {
    if a == b {
        return false;
    }
    if a.0 < b.0 {
        a.0 < x.0 && x.0 < b.0
    } else {
        x.0 > a.0 || x.0 < b.0
    }
}

/// `in_open(x, a, b) || x == b`. `a == b` collapses to `x == b`.
#[must_use]
pub fn in_right_closed(x: Id, a: Id, b: Id) -> bool {
    if a == b {
        return x == b;
    }
    in_open(x, a, b) || x == b
}

/// `in_open(x, a, b) || x == a || x == b`.
#[must_use]
pub fn in_closed(x: Id, a: Id, b: Id) -> bool {
    if a == b {
        return x == a;
    }
    in_open(x, a, b) || x == a || x == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> Id {
        Id(v)
    }

    #[test]
    fn open_interval_no_wrap() {
        assert!(in_open(id(5), id(2), id(10)));
        assert!(!in_open(id(2), id(2), id(10)));
        assert!(!in_open(id(10), id(2), id(10)));
        assert!(!in_open(id(15), id(2), id(10)));
    }

    #[test]
    fn open_interval_wraps() {
        // a=250, b=10 on an 8-bit ring: wraps across 0.
        assert!(in_open(id(255), id(250), id(10)));
        assert!(in_open(id(5), id(250), id(10)));
        assert!(!in_open(id(100), id(250), id(10)));
    }

    #[test]
    fn degenerate_interval_rules() {
        // a == b: open is empty, right-closed is exactly {b}.
        assert!(!in_open(id(7), id(7), id(7)));
        assert!(!in_right_closed(id(3), id(7), id(7)));
        assert!(in_right_closed(id(7), id(7), id(7)));
    }

    #[test]
    fn right_closed_includes_upper_bound() {
        assert!(in_right_closed(id(10), id(2), id(10)));
        assert!(!in_right_closed(id(2), id(2), id(10)));
    }

    #[test]
    fn hash_is_deterministic_and_bounded() {
        let space = IdSpace::new(16);
        let a = space.hash_str("alpha.txt");
        let b = space.hash_str("alpha.txt");
        assert_eq!(a, b);
        assert!(a.value() < space.ring_size() as u64);
    }

    #[test]
    fn add_pow2_wraps_at_ring_boundary() {
        let space = IdSpace::new(8);
        let near_top = space.wrap(250);
        let wrapped = space.add_pow2(near_top, 3); // +8
        assert_eq!(wrapped, space.wrap((250u64 + 8) % 256));
    }
}
