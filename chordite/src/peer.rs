//! Peer wiring: constructs the ring, local stores, rehash engine and
//! transport for one process, drives join/leave, and exposes the
//! client-facing `put`/`get`/`search` surface plus the background
//! maintenance loops (stabilize, fix_fingers, check_predecessor,
//! bootstrap heartbeat).

use crate::bootstrap_client::BootstrapClient;
use crate::config::PeerArgs;
use crate::error::{ChorditeError, Result};
use chordite_core::config::Config;
use chordite_core::id::IdSpace;
use chordite_core::index::InvertedIndex;
use chordite_core::peer::Peer;
use chordite_core::rehash::RehashEngine;
use chordite_core::replicas::replica_chain;
use chordite_core::ring::{Ring, StabilizeOutcome};
use chordite_core::store::FileStore;
use chordite_core::tokenizer::{score, tokenize};
use chordite_core::transport::Transport;
use chordite_net::client::TcpTransport;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One ranked search result: the source file, where it lives, and its
/// relevance score against the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub filename: String,
    pub origin: Peer,
    pub score: f32,
}

/// A point-in-time snapshot of ring and storage state, for the `status`
/// client call and for operational logging.
#[derive(Debug, Clone)]
pub struct PeerStatus {
    pub self_peer: Peer,
    pub successor: Peer,
    pub predecessor: Option<Peer>,
    pub primary_file_count: usize,
    pub backup_file_count: usize,
    pub token_count: usize,
    pub posting_count: usize,
}

/// Everything one peer process owns, short of the inbound listener
/// (which the binary entry point holds directly so it can drive a
/// drained shutdown independent of this struct's lifetime).
pub struct ChorditePeer {
    pub self_peer: Peer,
    pub space: IdSpace,
    pub config: Config,
    pub ring: Arc<Ring>,
    pub store: Arc<FileStore>,
    pub index: Arc<InvertedIndex>,
    pub rehash: Arc<RehashEngine>,
    pub transport: Arc<dyn Transport>,
    bootstrap: Option<BootstrapClient>,
}

impl ChorditePeer {
    /// Build a peer from parsed CLI args, but do not yet join a ring or
    /// bind a listener — the caller sequences those explicitly so it can
    /// hold onto the listener itself.
    #[must_use]
    pub fn new(args: &PeerArgs) -> Arc<Self> {
        let bootstrap = args.bootstrap.as_ref().map(|addr| BootstrapClient::new(addr.clone(), args.core_config().net_timeout));
        Self::from_parts(Peer::new(args.core_config().id_space(), args.advertise_host(), args.port), args.core_config(), bootstrap)
    }

    /// Build a peer directly from a resolved identity and config,
    /// bypassing CLI parsing — used by integration tests that need
    /// sub-second maintenance intervals `PeerArgs`'s whole-seconds flags
    /// can't express.
    #[must_use]
    pub fn from_parts(self_peer: Peer, config: Config, bootstrap: Option<BootstrapClient>) -> Arc<Self> {
        let space = config.id_space();
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(config.net_timeout));
        let store = Arc::new(FileStore::new());
        let index = Arc::new(InvertedIndex::new());
        let ring = Arc::new(Ring::new(self_peer.clone(), space, Arc::clone(&transport)));
        let rehash = Arc::new(RehashEngine::new(Arc::clone(&store), Arc::clone(&index), Arc::clone(&transport)));

        Arc::new(Self { self_peer, space, config, ring, store, index, rehash, transport, bootstrap })
    }

    /// Resolve a join seed (explicit `--seed`, or the bootstrap
    /// registry's seed list, or none) and join the ring. A newcomer then
    /// pulls its owned arc from its new successor (4.H case a); since the
    /// newcomer has no predecessor yet at join time, the successor's
    /// *current* predecessor is used as the lower bound — the arc owner
    /// immediately before we spliced in — falling back to our own id
    /// (an empty pull) if the successor reports none.
    pub async fn join(self: &Arc<Self>, args: &PeerArgs) -> Result<()> {
        let seed = self.resolve_seed(args).await?;
        self.ring.join(seed).await?;

        let successor = self.ring.successor();
        if successor != self.self_peer {
            let lower = match self.transport.get_predecessor(&successor).await {
                Ok(Some(pred)) => pred.id,
                _ => self.self_peer.id,
            };
            let pulled = self.rehash.pull_from_successor(&successor, lower, self.self_peer.id).await;
            info!(pulled, successor = %successor, "join: pulled owned arc from successor");
        } else {
            info!(peer = %self.self_peer, "join: founded new ring");
        }
        Ok(())
    }

    async fn resolve_seed(&self, args: &PeerArgs) -> Result<Option<Peer>> {
        if let Some(seed_addr) = &args.seed {
            let (host, port) = parse_addr(seed_addr)?;
            return Ok(Some(Peer::new(self.space, host, port)));
        }

        if let Some(bootstrap) = &self.bootstrap {
            let peers = bootstrap.register(&self.self_peer.host, self.self_peer.port).await?;
            return Ok(peers.into_iter().next());
        }

        Ok(None)
    }

    /// Store `bytes` under `filename`: compute its key, resolve the
    /// owner, and push the bytes there in one RPC. The owner fans the
    /// file out to a backup replica and the inverted index itself (4.G).
    pub async fn put(&self, filename: impl Into<String>, bytes: Vec<u8>) -> Result<Peer> {
        let filename = filename.into();
        let key = self.space.hash_str(&filename);
        let owner = self.ring.find_successor(key).await?;
        self.transport.store_file(&owner, filename, bytes, key).await?;
        Ok(owner)
    }

    /// Fetch `filename`'s bytes: primary owner first, then each replica
    /// in turn on failure (a dead or not-yet-rehashed owner).
    pub async fn get(&self, filename: &str) -> Result<Vec<u8>> {
        let key = self.space.hash_str(filename);
        let owner = self.ring.find_successor(key).await?;

        if let Ok(Some(bytes)) = self.transport.get_file(&owner, filename).await {
            return Ok(bytes);
        }

        let chain = replica_chain(self.transport.as_ref(), owner.clone(), self.config.r.max(1))
            .await
            .unwrap_or_else(|_| vec![owner.clone()]);
        for replica in chain.into_iter().filter(|p| *p != owner) {
            if let Ok(Some(bytes)) = self.transport.get_file(&replica, filename).await {
                return Ok(bytes);
            }
        }

        Err(ChorditeError::NotFound(filename.to_string()))
    }

    /// Tokenize `query`, fan out `lookup_token` to each token's owner,
    /// union the results by filename, and rank by relevance.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_filename = BTreeMap::new();
        for token in &query_tokens {
            let token_key = self.space.hash_str(token);
            let owner = match self.ring.find_successor(token_key).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(token = %token, error = %e, "search: token owner resolution failed");
                    continue;
                }
            };
            match self.transport.lookup_token(&owner, token).await {
                Ok(postings) => {
                    for meta in postings {
                        by_filename.entry(meta.filename.clone()).or_insert(meta);
                    }
                }
                Err(e) => warn!(token = %token, error = %e, "search: lookup_token failed"),
            }
        }

        let mut hits: Vec<SearchHit> = by_filename
            .into_values()
            .filter_map(|meta| {
                let (host, port) = parse_addr(&meta.origin_node_addr).ok()?;
                let origin = Peer::with_id(meta.origin_node_id, host, port);
                let file_tokens = meta.all_tokens.iter().cloned().collect();
                Some(SearchHit { filename: meta.filename, origin, score: score(&query_tokens, &file_tokens) })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(hits)
    }

    /// Graceful departure (5's "Cancellation" + 4.D's "Graceful leave"):
    /// hand every primary record to the successor, re-insert held
    /// postings at the successor, fix up the neighbours' pointers, and
    /// unregister from the bootstrap registry. The caller still owns the
    /// listener and background tasks and shuts those down separately.
    pub async fn leave(&self) -> Result<()> {
        let successor = self.ring.successor();
        let predecessor = self.ring.predecessor();

        if successor != self.self_peer {
            let files = self.store.scan_arc(|_| true);
            for file in files {
                if let Err(e) =
                    self.transport.store_file(&successor, file.filename.clone(), file.bytes.to_vec(), file.key).await
                {
                    warn!(file = %file.filename, error = %e, "leave: file handoff failed, orphan tolerated");
                }
            }
            self.rehash.reinsert_postings_on_leave(&successor).await;

            if let Some(pred) = &predecessor {
                if let Err(e) = self.transport.update_successor(pred, Some(successor.clone())).await {
                    warn!(predecessor = %pred, error = %e, "leave: predecessor's successor update failed");
                }
            }
            if let Err(e) = self.transport.update_predecessor(&successor, predecessor.clone()).await {
                warn!(successor = %successor, error = %e, "leave: successor's predecessor update failed");
            }
        }

        if let Some(bootstrap) = &self.bootstrap {
            if let Err(e) = bootstrap.unregister(&self.self_peer.host, self.self_peer.port).await {
                warn!(error = %e, "leave: bootstrap unregister failed");
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            self_peer: self.self_peer.clone(),
            successor: self.ring.successor(),
            predecessor: self.ring.predecessor(),
            primary_file_count: self.store.primary_count(),
            backup_file_count: self.store.backup_count(),
            token_count: self.index.token_count(),
            posting_count: self.index.posting_count(),
        }
    }
}

fn parse_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| ChorditeError::NotFound(format!("malformed address: {addr}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| ChorditeError::NotFound(format!("malformed port in address: {addr}")))?;
    Ok((host.to_string(), port))
}

/// Spawn the periodic maintenance loops (4.B's timer table) and return
/// their task handles so the caller can await a drained shutdown.
#[must_use]
pub fn spawn_background_tasks(
    peer: Arc<ChorditePeer>,
    stopping: Arc<AtomicBool>,
) -> Vec<compio::runtime::Task<()>> {
    let mut tasks = Vec::with_capacity(4);

    tasks.push(compio::runtime::spawn(stabilize_loop(Arc::clone(&peer), Arc::clone(&stopping))));
    tasks.push(compio::runtime::spawn(fix_fingers_loop(Arc::clone(&peer), Arc::clone(&stopping))));
    tasks.push(compio::runtime::spawn(check_predecessor_loop(Arc::clone(&peer), Arc::clone(&stopping))));
    if peer.bootstrap.is_some() {
        tasks.push(compio::runtime::spawn(heartbeat_loop(peer, stopping)));
    }

    tasks
}

async fn stabilize_loop(peer: Arc<ChorditePeer>, stopping: Arc<AtomicBool>) {
    while !stopping.load(Ordering::SeqCst) {
        compio::time::sleep(peer.config.stabilize_interval).await;
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        match peer.ring.stabilize().await {
            StabilizeOutcome::AdoptedCloserSuccessor(new_successor) => {
                peer.rehash.push_backup(&new_successor).await;
            }
            StabilizeOutcome::HealedAfterFailure(_) => {
                peer.rehash.promote_after_heal();
            }
            StabilizeOutcome::Unchanged => {}
        }
    }
}

async fn fix_fingers_loop(peer: Arc<ChorditePeer>, stopping: Arc<AtomicBool>) {
    while !stopping.load(Ordering::SeqCst) {
        compio::time::sleep(peer.config.fix_fingers_interval).await;
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        peer.ring.fix_fingers().await;
    }
}

async fn check_predecessor_loop(peer: Arc<ChorditePeer>, stopping: Arc<AtomicBool>) {
    while !stopping.load(Ordering::SeqCst) {
        compio::time::sleep(peer.config.check_predecessor_interval).await;
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        if peer.ring.check_predecessor().await.is_some() {
            peer.rehash.promote_after_heal();
        }
    }
}

async fn heartbeat_loop(peer: Arc<ChorditePeer>, stopping: Arc<AtomicBool>) {
    let Some(bootstrap) = peer.bootstrap.as_ref() else { return };
    while !stopping.load(Ordering::SeqCst) {
        compio::time::sleep(peer.config.heartbeat_interval).await;
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        match bootstrap.heartbeat(&peer.self_peer.host, peer.self_peer.port).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("heartbeat: registry forgot us, re-registering");
                let _ = bootstrap.register(&peer.self_peer.host, peer.self_peer.port).await;
            }
            Err(e) => warn!(error = %e, "heartbeat: bootstrap unreachable"),
        }
    }
}

/// Pause for `drain_timeout`-bounded completion of every background
/// task after setting `stopping`.
pub async fn shutdown_background_tasks(
    tasks: Vec<compio::runtime::Task<()>>,
    stopping: &AtomicBool,
    drain_timeout: Duration,
) {
    stopping.store(true, Ordering::SeqCst);
    for task in tasks {
        if compio::time::timeout(drain_timeout, task).await.is_err() {
            warn!("background task did not drain within deadline, abandoning");
        }
    }
}
