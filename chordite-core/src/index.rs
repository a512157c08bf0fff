//! Local inverted-index postings map: `token -> filename -> FileMetadata`.
//!
//! Each peer only ever holds postings for tokens it owns
//! (`succ(hash(token))`); there is no replication of index entries (see
//! the open question in the design notes — the source keeps r=1 for
//! postings and so do we).

use crate::id::Id;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Metadata describing a file, as stored in a posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub file_key: Id,
    pub origin_node_id: Id,
    pub origin_node_addr: String,
    pub all_tokens: Vec<String>,
    pub size: u64,
}

/// Postings for a single token: `filename -> FileMetadata`, upserted by
/// filename.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: DashMap<String, DashMap<String, FileMetadata>>,
}

impl InvertedIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a posting for `token`: same filename replaces prior
    /// metadata.
    pub fn upsert(&self, token: String, meta: FileMetadata) {
        self.postings
            .entry(token)
            .or_default()
            .insert(meta.filename.clone(), meta);
    }

    /// All metadata currently posted under `token`.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Vec<FileMetadata> {
        self.postings
            .get(token)
            .map(|m| m.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    #[must_use]
    pub fn posting_count(&self) -> usize {
        self.postings.iter().map(|e| e.value().len()).sum()
    }

    /// All `(token, postings)` pairs this peer holds — used when leaving
    /// to re-insert postings at their post-leave owner.
    #[must_use]
    pub fn drain_all(&self) -> Vec<(String, Vec<FileMetadata>)> {
        self.postings
            .iter()
            .map(|e| (e.key().clone(), e.value().iter().map(|p| p.value().clone()).collect()))
            .collect()
    }
}
