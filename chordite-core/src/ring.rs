//! Ring state and protocol: join, `find_successor`, stabilize, notify,
//! fix-fingers, check-predecessor, successor recovery, graceful leave.
//!
//! One [`parking_lot::RwLock`] covers the ring triple (successor,
//! predecessor, finger table) per the locking discipline in the
//! concurrency model: short critical sections, never held across an
//! `.await`. Every method that crosses the network reads or writes the
//! lock, releases it, then awaits.

use crate::error::{CoreError, Result};
use crate::id::{in_open, in_right_closed, Id, IdSpace};
use crate::peer::Peer;
use crate::transport::Transport;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The mutable ring triple: successor, predecessor, and finger table.
#[derive(Debug, Clone)]
pub struct RingState {
    pub successor: Peer,
    pub predecessor: Option<Peer>,
    pub fingers: Vec<Option<Peer>>,
    pub next_finger_to_fix: usize,
}

impl RingState {
    fn founder(self_peer: &Peer, m: u32) -> Self {
        Self {
            successor: self_peer.clone(),
            predecessor: None,
            fingers: vec![Some(self_peer.clone()); m as usize],
            next_finger_to_fix: 0,
        }
    }
}

/// Outcome of a `notify` call: whether the predecessor changed, and what
/// it changed from — the peer-wiring layer uses this to trigger the
/// backup handoff described in 4.H.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub changed: bool,
    pub previous: Option<Peer>,
}

/// Outcome of a `stabilize` round — distinguishes the two rehash
/// triggers in 4.H that both start from "our successor changed":
/// a healthy reconciliation (4.H case b: push a backup to the new
/// successor) from a failure-triggered heal (case c: promote our own
/// backups, since we now transiently own the dead peer's arc).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StabilizeOutcome {
    /// Successor unchanged this round (the common steady-state case).
    Unchanged,
    /// `get_predecessor` returned a peer strictly closer than our prior
    /// successor; we adopted it. Case (b): push a fresh backup.
    AdoptedCloserSuccessor(Peer),
    /// The prior successor was unreachable and we healed onto a new one.
    /// Case (c): promote our backups to primary.
    HealedAfterFailure(Peer),
}

/// Ring topology maintenance for one peer.
pub struct Ring {
    pub self_peer: Peer,
    pub space: IdSpace,
    state: RwLock<RingState>,
    transport: Arc<dyn Transport>,
}

impl Ring {
    #[must_use]
    pub fn new(self_peer: Peer, space: IdSpace, transport: Arc<dyn Transport>) -> Self {
        let state = RingState::founder(&self_peer, space.bits());
        Self {
            self_peer,
            space,
            state: RwLock::new(state),
            transport,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> RingState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn successor(&self) -> Peer {
        self.state.read().successor.clone()
    }

    #[must_use]
    pub fn predecessor(&self) -> Option<Peer> {
        self.state.read().predecessor.clone()
    }

    fn set_successor(&self, peer: Peer) {
        self.state.write().successor = peer;
    }

    fn set_predecessor(&self, peer: Option<Peer>) {
        self.state.write().predecessor = peer;
    }

    /// Join the ring. `seed = None` founds a new ring. Otherwise asks
    /// `seed` to resolve our own id, and adopts the result as successor;
    /// fingers are left stale and converge via `fix_fingers`.
    pub async fn join(&self, seed: Option<Peer>) -> Result<()> {
        match seed {
            None => {
                self.set_successor(self.self_peer.clone());
                self.set_predecessor(None);
                info!(peer = %self.self_peer, "founded new ring");
                Ok(())
            }
            Some(seed) => {
                let successor = self
                    .transport
                    .find_successor(&seed, self.self_peer.id)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "join: seed unreachable");
                        e
                    })?;
                self.set_successor(successor.clone());
                self.set_predecessor(None);
                info!(peer = %self.self_peer, successor = %successor, "joined ring");
                Ok(())
            }
        }
    }

    /// `closest_preceding_finger(key)`: the highest-indexed finger strictly
    /// between `self` and `key`; `self` if none qualifies.
    fn closest_preceding_finger(&self, key: Id) -> Peer {
        let state = self.state.read();
        for finger in state.fingers.iter().rev() {
            if let Some(f) = finger {
                if in_open(f.id, self.self_peer.id, key) {
                    return f.clone();
                }
            }
        }
        self.self_peer.clone()
    }

    /// Resolve the successor of `key`, hopping through the ring via
    /// finger-table shortcuts. Caps at `self.space.bits()` hops and
    /// returns the best-known successor as a degraded answer if routing
    /// does not converge within that bound.
    pub async fn find_successor(&self, key: Id) -> Result<Peer> {
        let max_hops = self.space.bits();
        let mut hops = 0u32;
        let mut current_self_successor = self.successor();

        // Ring of one.
        if current_self_successor == self.self_peer {
            return Ok(self.self_peer.clone());
        }
        if in_right_closed(key, self.self_peer.id, current_self_successor.id) {
            return Ok(current_self_successor);
        }

        let mut hop_target = self.closest_preceding_finger(key);
        if hop_target == self.self_peer {
            // No finger qualifies; fall back to asking our successor directly.
            hop_target = current_self_successor.clone();
        }

        loop {
            if hops >= max_hops {
                warn!(%key, hops, "find_successor degraded: returning best-known successor");
                return Ok(current_self_successor);
            }
            hops += 1;

            match self.transport.find_successor(&hop_target, key).await {
                Ok(resolved) => return Ok(resolved),
                Err(e) => {
                    debug!(target = %hop_target, error = %e, "find_successor hop failed, retrying via successor");
                    current_self_successor = hop_target;
                    hop_target = self.successor();
                    if hop_target == current_self_successor {
                        return Ok(current_self_successor);
                    }
                }
            }
        }
    }

    /// Local decision used by the RPC handler side: given a request for
    /// `key`, either answer directly or name the next hop to forward to.
    pub fn route_locally(&self, key: Id) -> RouteDecision {
        let state = self.state.read();
        if self.self_peer == state.successor {
            return RouteDecision::Answer(self.self_peer.clone());
        }
        if in_right_closed(key, self.self_peer.id, state.successor.id) {
            return RouteDecision::Answer(state.successor.clone());
        }
        drop(state);
        RouteDecision::Forward(self.closest_preceding_finger(key))
    }

    /// One stabilize round: ask the successor for its predecessor, adopt
    /// it if it is strictly between us and our current successor, then
    /// notify the (possibly new) successor of our own existence.
    pub async fn stabilize(&self) -> StabilizeOutcome {
        let successor = self.successor();
        if successor == self.self_peer {
            // Singleton ring. `(n, successor)` degenerates to the empty
            // interval when n == successor, so the formula below can
            // never fire here; a lone founder only ever learns about a
            // newcomer through the newcomer's own `notify`, which sets
            // our predecessor but not our successor. Adopt our
            // predecessor as successor directly so the ring actually
            // grows past one member.
            return match self.predecessor() {
                Some(pred) if pred != self.self_peer => {
                    debug!(new = %pred, "stabilize: singleton adopting predecessor as successor");
                    self.set_successor(pred.clone());
                    if let Err(e) = self.transport.notify(&pred, self.self_peer.clone()).await {
                        debug!(error = %e, "stabilize: notify failed");
                    }
                    StabilizeOutcome::AdoptedCloserSuccessor(pred)
                }
                _ => StabilizeOutcome::Unchanged,
            };
        }

        match self.transport.get_predecessor(&successor).await {
            Ok(Some(candidate)) if in_open(candidate.id, self.self_peer.id, successor.id) => {
                debug!(old = %successor, new = %candidate, "stabilize: adopting closer successor");
                self.set_successor(candidate.clone());
                if let Err(e) = self.transport.notify(&candidate, self.self_peer.clone()).await {
                    debug!(error = %e, "stabilize: notify failed");
                }
                StabilizeOutcome::AdoptedCloserSuccessor(candidate)
            }
            Ok(_) => {
                if let Err(e) = self.transport.notify(&successor, self.self_peer.clone()).await {
                    debug!(error = %e, "stabilize: notify failed");
                }
                StabilizeOutcome::Unchanged
            }
            Err(e) => {
                warn!(successor = %successor, error = %e, "stabilize: successor unreachable, healing");
                if self.heal_successor().await {
                    StabilizeOutcome::HealedAfterFailure(self.successor())
                } else {
                    StabilizeOutcome::Unchanged
                }
            }
        }
    }

    /// `notify(candidate)`: become our predecessor if we have none, or if
    /// `candidate` is strictly closer than our current one.
    pub fn notify(&self, candidate: Peer) -> NotifyOutcome {
        let mut state = self.state.write();
        let should_adopt = match &state.predecessor {
            None => true,
            Some(pred) => in_open(candidate.id, pred.id, self.self_peer.id),
        };
        if should_adopt {
            let previous = state.predecessor.replace(candidate);
            NotifyOutcome { changed: true, previous }
        } else {
            NotifyOutcome { changed: false, previous: state.predecessor.clone() }
        }
    }

    /// Round-robin one finger per tick.
    pub async fn fix_fingers(&self) {
        let (next, start) = {
            let mut state = self.state.write();
            let m = state.fingers.len() as u32;
            state.next_finger_to_fix = (state.next_finger_to_fix + 1) % m as usize;
            let next = state.next_finger_to_fix;
            (next, self.space.add_pow2(self.self_peer.id, next as u32))
        };

        match self.find_successor(start).await {
            Ok(peer) => {
                self.state.write().fingers[next] = Some(peer);
            }
            Err(e) => {
                debug!(error = %e, finger = next, "fix_fingers: left stale");
            }
        }
    }

    /// If the predecessor fails a liveness probe, clear it. Also sweeps
    /// the finger table, nulling dead entries. Returns `Some(new
    /// successor)` if the consistency sweep found our successor dead and
    /// healed onto a replacement — the peer-wiring layer promotes
    /// backups to primary in that case (4.H case c).
    pub async fn check_predecessor(&self) -> Option<Peer> {
        let predecessor = self.predecessor();
        if let Some(pred) = predecessor {
            if self.transport.ping(&pred).await.is_err() {
                warn!(predecessor = %pred, "check_predecessor: predecessor dead, clearing");
                self.set_predecessor(None);
            }
        }

        let fingers: Vec<Option<Peer>> = self.state.read().fingers.clone();
        for (i, finger) in fingers.into_iter().enumerate() {
            if let Some(f) = finger {
                if f != self.self_peer && self.transport.ping(&f).await.is_err() {
                    self.state.write().fingers[i] = None;
                }
            }
        }

        if self.successor() == self.self_peer && self.predecessor().is_none() {
            // Singleton with no predecessor: nothing to heal, this is
            // the expected steady state of a lone ring member.
            return None;
        }
        if self.transport.ping(&self.successor()).await.is_err() {
            if self.heal_successor().await {
                return Some(self.successor());
            }
        }
        None
    }

    /// Successor recovery: try fingers in ascending order, then ask the
    /// predecessor for its successor, else become a singleton.
    pub async fn heal_successor(&self) -> bool {
        let fingers: Vec<Option<Peer>> = self.state.read().fingers.clone();
        for finger in fingers.into_iter().flatten() {
            if finger == self.self_peer {
                continue;
            }
            if self.transport.ping(&finger).await.is_ok() {
                info!(new_successor = %finger, "heal: adopted finger as successor");
                self.set_successor(finger);
                return true;
            }
        }

        if let Some(pred) = self.predecessor() {
            if let Ok(Some(pred_succ)) = self.transport.get_successor(&pred).await {
                if pred_succ != self.self_peer && self.transport.ping(&pred_succ).await.is_ok() {
                    info!(new_successor = %pred_succ, "heal: adopted predecessor's successor");
                    self.set_successor(pred_succ);
                    return true;
                }
            }
        }

        warn!(peer = %self.self_peer, "heal: no live neighbour found, becoming singleton");
        self.set_successor(self.self_peer.clone());
        false
    }

    /// Apply a remote `update_successor` / `update_predecessor` command
    /// (used during a neighbour's graceful leave).
    pub fn apply_new_successor(&self, new: Option<Peer>) {
        self.set_successor(new.unwrap_or_else(|| self.self_peer.clone()));
    }

    pub fn apply_new_predecessor(&self, new: Option<Peer>) {
        self.set_predecessor(new);
    }
}

/// What a peer receiving a `find_successor` request should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Answer(Peer),
    Forward(Peer),
}
