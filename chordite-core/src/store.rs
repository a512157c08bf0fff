//! File store: per-peer `primary`/`backup` maps of `filename -> File`.
//!
//! Concurrency: each map is its own `DashMap`, never locked together with
//! the ring triple, and never held across a network call (lock order is
//! ring -> primary -> backup -> index, but no call here acquires more
//! than one at a time).

use crate::id::Id;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Wire-serializable rendering of a [`File`], used by `transfer_arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub key: Id,
}

impl From<&File> for TransferRecord {
    fn from(f: &File) -> Self {
        Self {
            filename: f.filename.clone(),
            bytes: f.bytes.to_vec(),
            key: f.key,
        }
    }
}

/// An in-memory file record: filename, bytes, and the key it hashes to.
#[derive(Debug, Clone)]
pub struct File {
    pub filename: String,
    pub bytes: Arc<[u8]>,
    pub key: Id,
}

/// Result of a local `store` call, distinguishing "this peer owns it" from
/// "caller should forward it elsewhere".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    StoredHere,
    Forwarded,
}

/// Local file storage: a primary map (records this peer is authoritative
/// for) and a backup map (records replicated here from the predecessor).
#[derive(Debug, Default)]
pub struct FileStore {
    primary: DashMap<String, File>,
    backup: DashMap<String, File>,
}

impl FileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert into the primary map (this peer is the owner of `key`).
    pub fn put_primary(&self, filename: String, bytes: Arc<[u8]>, key: Id) {
        self.primary.insert(filename.clone(), File { filename, bytes, key });
    }

    /// Insert into the backup map (replicated from the predecessor).
    pub fn put_backup(&self, filename: String, bytes: Arc<[u8]>, key: Id) {
        self.backup.insert(filename.clone(), File { filename, bytes, key });
    }

    /// `retrieve`: primary first; if only present as a backup, promote it
    /// to primary (this is the recovery path: the original primary died
    /// and we are now serving from what we were holding as a replica).
    pub fn retrieve(&self, filename: &str) -> Option<Arc<[u8]>> {
        if let Some(f) = self.primary.get(filename) {
            return Some(Arc::clone(&f.bytes));
        }
        if let Some((_, f)) = self.backup.remove(filename) {
            let bytes = Arc::clone(&f.bytes);
            self.primary.insert(f.filename.clone(), f);
            return Some(bytes);
        }
        None
    }

    #[must_use]
    pub fn contains_primary(&self, filename: &str) -> bool {
        self.primary.contains_key(filename)
    }

    /// Records in `primary` whose key lies in `(lower, upper]`; used by
    /// the rehash engine to answer `transfer_arc`.
    #[must_use]
    pub fn scan_arc(
        &self,
        in_range: impl Fn(Id) -> bool,
    ) -> Vec<File> {
        self.primary
            .iter()
            .filter(|e| in_range(e.key))
            .map(|e| e.value().clone())
            .collect()
    }

    /// Two-phase delete: caller has acked receipt of the transferred
    /// records, now remove them from primary.
    pub fn delete_primary(&self, filenames: &[String]) {
        for name in filenames {
            self.primary.remove(name);
        }
    }

    /// Replace the backup map wholesale with a fresh snapshot pushed by
    /// the new successor (used on rehash-push, 4.H case (b)).
    pub fn replace_backup(&self, files: Vec<File>) {
        self.backup.clear();
        for f in files {
            self.backup.insert(f.filename.clone(), f);
        }
    }

    /// Promote every backup entry to primary (heal path (c): we inherited
    /// the dead peer's arc and were already holding its replicas).
    pub fn promote_all_backups(&self) {
        let entries: Vec<File> = self.backup.iter().map(|e| e.value().clone()).collect();
        for f in entries {
            self.backup.remove(&f.filename);
            self.primary.insert(f.filename.clone(), f);
        }
    }

    #[must_use]
    pub fn primary_count(&self) -> usize {
        self.primary.len()
    }

    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.backup.len()
    }

    #[must_use]
    pub fn all_primary_filenames(&self) -> Vec<String> {
        self.primary.iter().map(|e| e.key().clone()).collect()
    }
}
