//! Rehashing engine: moves keys whose ownership changed on join, leave,
//! or failure, and keeps backups current.
//!
//! Three entry points, one per trigger in the component design:
//! - [`RehashEngine::pull_from_successor`] — newcomer pull (4.H case a)
//! - [`RehashEngine::push_backup`] — successor-changed push (4.H case b)
//! - [`RehashEngine::promote_after_heal`] — heal promotion (4.H case c)
//! - [`RehashEngine::reinsert_postings_on_leave`] — graceful-leave index
//!   handoff (4.I)

use crate::id::{in_right_closed, Id};
use crate::index::InvertedIndex;
use crate::peer::Peer;
use crate::store::{FileStore, TransferRecord};
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RehashEngine {
    store: Arc<FileStore>,
    index: Arc<InvertedIndex>,
    transport: Arc<dyn Transport>,
}

impl RehashEngine {
    #[must_use]
    pub fn new(store: Arc<FileStore>, index: Arc<InvertedIndex>, transport: Arc<dyn Transport>) -> Self {
        Self { store, index, transport }
    }

    /// Newcomer pull: ask `successor` for every record whose key falls in
    /// `(predecessor.id, self.id]`, install them locally, then tell
    /// `successor` it can delete them. Two-phase (GET then DELETE) so a
    /// crash mid-transfer leaves both sides holding the record rather
    /// than neither.
    pub async fn pull_from_successor(&self, successor: &Peer, predecessor_id: Id, self_id: Id) -> usize {
        let records = match self.transport.transfer_arc(successor, predecessor_id, self_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!(successor = %successor, error = %e, "rehash pull: transfer_arc failed");
                return 0;
            }
        };

        let mut filenames = Vec::with_capacity(records.len());
        for rec in &records {
            self.store.put_primary(rec.filename.clone(), Arc::from(rec.bytes.as_slice()), rec.key);
            filenames.push(rec.filename.clone());
        }

        if !filenames.is_empty() {
            if let Err(e) = self.transport.delete_keys(successor, filenames.clone()).await {
                debug!(error = %e, "rehash pull: delete_keys failed, successor will hold a transient duplicate");
            }
        }
        debug!(count = filenames.len(), successor = %successor, "rehash pull complete");
        filenames.len()
    }

    /// Successor-changed push: replace the backup slot on `new_successor`
    /// with everything we currently hold as primary.
    pub async fn push_backup(&self, new_successor: &Peer) {
        let records: Vec<TransferRecord> = self
            .store
            .scan_arc(|_| true)
            .iter()
            .map(TransferRecord::from)
            .collect();

        if let Err(e) = self.transport.push_backup(new_successor, records).await {
            debug!(successor = %new_successor, error = %e, "rehash push: failed, will retry on next stabilize");
        }
    }

    /// Heal promotion: we just inherited a dead peer's arc by adopting
    /// its successor; promote whatever we were already holding as backup
    /// (the replication invariant means that should be most of it).
    pub fn promote_after_heal(&self) {
        self.store.promote_all_backups();
    }

    /// Graceful-leave index handoff: re-insert every posting this peer
    /// holds at `successor`, which is the new owner of this peer's arc.
    pub async fn reinsert_postings_on_leave(&self, successor: &Peer) {
        for (token, metas) in self.index.drain_all() {
            for meta in metas {
                if let Err(e) = self.transport.store_posting(successor, token.clone(), meta).await {
                    debug!(token = %token, error = %e, "leave: posting re-insert failed, orphan tolerated");
                }
            }
        }
    }
}

/// Keys in `store`'s primary map whose key now falls outside `(lower,
/// self_id]` (used after a rehash pull completes on the *sender* side to
/// know what was already transferred — primarily exercised via
/// [`RehashEngine::pull_from_successor`]'s two-phase delete).
#[must_use]
pub fn keys_in_arc(filenames_with_keys: &[(String, Id)], lower: Id, upper: Id) -> Vec<String> {
    filenames_with_keys
        .iter()
        .filter(|(_, k)| in_right_closed(*k, lower, upper))
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileMetadata;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingTransport {
        pushed: Mutex<Vec<(Peer, Vec<TransferRecord>)>>,
        reinserted: Mutex<Vec<(Peer, String, FileMetadata)>>,
        to_transfer: Vec<TransferRecord>,
        deleted: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn find_successor(&self, _t: &Peer, _k: Id) -> crate::error::Result<Peer> {
            unimplemented!()
        }
        async fn get_predecessor(&self, _t: &Peer) -> crate::error::Result<Option<Peer>> {
            unimplemented!()
        }
        async fn get_successor(&self, _t: &Peer) -> crate::error::Result<Option<Peer>> {
            unimplemented!()
        }
        async fn notify(&self, _t: &Peer, _c: Peer) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn ping(&self, _t: &Peer) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn store_file(&self, _t: &Peer, _f: String, _b: Vec<u8>, _k: Id) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn get_file(&self, _t: &Peer, _f: &str) -> crate::error::Result<Option<Vec<u8>>> {
            unimplemented!()
        }
        async fn store_posting(&self, t: &Peer, token: String, meta: FileMetadata) -> crate::error::Result<()> {
            self.reinserted.lock().unwrap().push((t.clone(), token, meta));
            Ok(())
        }
        async fn lookup_token(&self, _t: &Peer, _tok: &str) -> crate::error::Result<Vec<FileMetadata>> {
            unimplemented!()
        }
        async fn transfer_arc(&self, _t: &Peer, _l: Id, _u: Id) -> crate::error::Result<Vec<TransferRecord>> {
            Ok(self.to_transfer.clone())
        }
        async fn delete_keys(&self, _t: &Peer, f: Vec<String>) -> crate::error::Result<()> {
            self.deleted.lock().unwrap().push(f);
            Ok(())
        }
        async fn update_successor(&self, _t: &Peer, _n: Option<Peer>) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn update_predecessor(&self, _t: &Peer, _n: Option<Peer>) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn push_backup(&self, target: &Peer, files: Vec<TransferRecord>) -> crate::error::Result<()> {
            self.pushed.lock().unwrap().push((target.clone(), files));
            Ok(())
        }
    }

    fn peer(id: u64) -> Peer {
        Peer::with_id(Id(id), "h".into(), id as u16)
    }

    #[test]
    fn pull_installs_records_and_acks_delete() {
        let rt = compio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = Arc::new(FileStore::new());
            let index = Arc::new(InvertedIndex::new());
            let transport = Arc::new(RecordingTransport {
                pushed: Mutex::new(vec![]),
                reinserted: Mutex::new(vec![]),
                to_transfer: vec![TransferRecord { filename: "a.txt".into(), bytes: b"AAA".to_vec(), key: Id(5) }],
                deleted: Mutex::new(vec![]),
            });
            let engine = RehashEngine::new(Arc::clone(&store), index, transport.clone());

            let count = engine.pull_from_successor(&peer(2), Id(0), Id(10)).await;
            assert_eq!(count, 1);
            assert!(store.contains_primary("a.txt"));
            assert_eq!(transport.deleted.lock().unwrap().len(), 1);
        });
    }

    #[test]
    fn reinsert_postings_forwards_everything_to_successor() {
        let rt = compio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = Arc::new(FileStore::new());
            let index = Arc::new(InvertedIndex::new());
            index.upsert(
                "learning".into(),
                FileMetadata {
                    filename: "x.txt".into(),
                    file_key: Id(1),
                    origin_node_id: Id(2),
                    origin_node_addr: "h:1".into(),
                    all_tokens: vec!["learning".into()],
                    size: 1,
                },
            );
            let transport = Arc::new(RecordingTransport {
                pushed: Mutex::new(vec![]),
                reinserted: Mutex::new(vec![]),
                to_transfer: vec![],
                deleted: Mutex::new(vec![]),
            });
            let engine = RehashEngine::new(store, Arc::clone(&index), transport.clone());
            engine.reinsert_postings_on_leave(&peer(3)).await;
            assert_eq!(transport.reinserted.lock().unwrap().len(), 1);
        });
    }
}
