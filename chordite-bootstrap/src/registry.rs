//! Registry state: `map<(host,port) -> {id, successor, predecessor,
//! last_heartbeat}>`, with insertion capacity, a bounded join-seed
//! prefix, and heartbeat-timeout eviction.
//!
//! Concurrency: one `DashMap`, no ring-triple lock to coordinate with —
//! the registry has no background protocol beyond the sweep, so a single
//! concurrent map (as the workspace already depends on for `chordite-core`'s
//! file/index maps) is the whole story here.

use chordite_core::id::{Id, IdSpace};
use chordite_core::peer::Peer;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Bounded prefix length of currently registered peers returned to a
/// newcomer on successful registration (source returns at most 2).
const JOIN_SEED_PREFIX: usize = 2;

#[derive(Debug, Clone)]
pub struct RegistrationRecord {
    pub id: Id,
    /// Mirrors the data model's `{id, successor, predecessor, ...}`
    /// shape; the registry's own wire contract (register/heartbeat) never
    /// actually carries successor/predecessor, so these stay `None` for
    /// the registry's own bookkeeping (see `DESIGN.md`).
    pub successor: Option<Peer>,
    pub predecessor: Option<Peer>,
    pub last_heartbeat: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Joined { peers: Vec<Peer> },
    Full,
    AlreadyRegistered,
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub m: u32,
    /// Maximum concurrently registered peers before `register` answers
    /// `Full` — a resource-exhaustion guard, not a Chord ring limit.
    pub max_peers: usize,
    pub heartbeat_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            m: chordite_core::id::DEFAULT_M,
            max_peers: 4096,
            heartbeat_timeout: Duration::from_secs(10),
        }
    }
}

pub struct Registry {
    space: IdSpace,
    config: RegistryConfig,
    entries: DashMap<(String, u16), RegistrationRecord>,
}

impl Registry {
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            space: IdSpace::new(config.m),
            config,
            entries: DashMap::new(),
        }
    }

    /// `register(host, port)`: idempotent-error on a live re-registration
    /// of the same pair (the source treats concurrent re-registration of
    /// an already-live entry as an error, not an upsert); capacity-bounded;
    /// returns up to [`JOIN_SEED_PREFIX`] other currently registered peers
    /// as join seeds.
    pub fn register(&self, host: &str, port: u16) -> RegisterOutcome {
        let key = (host.to_string(), port);
        if self.entries.contains_key(&key) {
            return RegisterOutcome::AlreadyRegistered;
        }
        if self.entries.len() >= self.config.max_peers {
            return RegisterOutcome::Full;
        }

        let peers: Vec<Peer> = self
            .entries
            .iter()
            .take(JOIN_SEED_PREFIX)
            .map(|e| Peer::with_id(e.value().id, e.key().0.clone(), e.key().1))
            .collect();

        let id = self.space.hash_str(&format!("{host}:{port}"));
        self.entries.insert(
            key,
            RegistrationRecord {
                id,
                successor: None,
                predecessor: None,
                last_heartbeat: Instant::now(),
            },
        );
        info!(host, port, seeds = peers.len(), "registered");
        RegisterOutcome::Joined { peers }
    }

    pub fn unregister(&self, host: &str, port: u16) -> bool {
        self.entries.remove(&(host.to_string(), port)).is_some()
    }

    /// `heartbeat(host, port)`: refresh liveness if registered, else
    /// `false` so the caller can re-register (the registry may have
    /// restarted and lost state since the peer's last heartbeat).
    pub fn heartbeat(&self, host: &str, port: u16) -> bool {
        if let Some(mut entry) = self.entries.get_mut(&(host.to_string(), port)) {
            entry.last_heartbeat = Instant::now();
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn list_peers(&self) -> Vec<Peer> {
        self.entries
            .iter()
            .map(|e| Peer::with_id(e.value().id, e.key().0.clone(), e.key().1))
            .collect()
    }

    /// Drop entries whose last heartbeat predates `now - heartbeat_timeout`.
    /// Returns the number of entries pruned, for the sweep loop to log.
    pub fn sweep(&self) -> usize {
        let deadline = self.config.heartbeat_timeout;
        let mut dead = Vec::new();
        for entry in self.entries.iter() {
            if entry.value().last_heartbeat.elapsed() > deadline {
                dead.push(entry.key().clone());
            }
        }
        for key in &dead {
            self.entries.remove(key);
        }
        if !dead.is_empty() {
            debug!(count = dead.len(), "sweep: pruned stale registrations");
        }
        dead.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RegistryConfig {
        RegistryConfig { m: 16, max_peers: 3, heartbeat_timeout: Duration::from_millis(50) }
    }

    #[test]
    fn first_registration_returns_no_seeds() {
        let reg = Registry::new(config());
        let outcome = reg.register("a", 1);
        assert_eq!(outcome, RegisterOutcome::Joined { peers: vec![] });
    }

    #[test]
    fn second_registration_sees_first_as_seed() {
        let reg = Registry::new(config());
        reg.register("a", 1);
        let outcome = reg.register("b", 2);
        match outcome {
            RegisterOutcome::Joined { peers } => assert_eq!(peers.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let reg = Registry::new(config());
        reg.register("a", 1);
        assert_eq!(reg.register("a", 1), RegisterOutcome::AlreadyRegistered);
    }

    #[test]
    fn registration_capped_at_max_peers() {
        let reg = Registry::new(config());
        reg.register("a", 1);
        reg.register("b", 2);
        reg.register("c", 3);
        assert_eq!(reg.register("d", 4), RegisterOutcome::Full);
    }

    #[test]
    fn heartbeat_on_unknown_peer_reports_false() {
        let reg = Registry::new(config());
        assert!(!reg.heartbeat("ghost", 9));
    }

    #[test]
    fn sweep_prunes_after_timeout() {
        let reg = Registry::new(config());
        reg.register("a", 1);
        std::thread::sleep(Duration::from_millis(80));
        let pruned = reg.sweep();
        assert_eq!(pruned, 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn heartbeat_resets_the_sweep_deadline() {
        let reg = Registry::new(config());
        reg.register("a", 1);
        std::thread::sleep(Duration::from_millis(30));
        assert!(reg.heartbeat("a", 1));
        std::thread::sleep(Duration::from_millis(30));
        // 60ms since registration but only 30ms since the refreshed heartbeat.
        assert_eq!(reg.sweep(), 0);
    }
}
