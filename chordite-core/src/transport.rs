//! The transport contract ring logic is built against.
//!
//! `chordite-core` never opens a socket. Everything that crosses the
//! network is expressed as a method on this trait; `chordite-net` supplies
//! the concrete implementation. This is the same split the teacher crate
//! draws between a sans-IO protocol layer and its actual actor/IO layer,
//! just drawn one level up: here the "protocol" is the Chord RPC set
//! instead of ZMTP framing.

use crate::error::Result;
use crate::id::Id;
use crate::index::FileMetadata;
use crate::peer::Peer;
use crate::store::TransferRecord;
use async_trait::async_trait;

/// Outbound RPCs a ring peer issues against another peer.
///
/// Every method may block for up to `T_net` and should return
/// [`crate::error::CoreError::PeerUnreachable`] on timeout or connection
/// failure rather than panicking — callers treat that uniformly as
/// "demote to suspect".
#[async_trait]
pub trait Transport: Send + Sync {
    async fn find_successor(&self, target: &Peer, key: Id) -> Result<Peer>;
    async fn get_predecessor(&self, target: &Peer) -> Result<Option<Peer>>;
    async fn get_successor(&self, target: &Peer) -> Result<Option<Peer>>;
    async fn notify(&self, target: &Peer, candidate: Peer) -> Result<()>;
    async fn ping(&self, target: &Peer) -> Result<()>;

    async fn store_file(&self, target: &Peer, filename: String, bytes: Vec<u8>, key: Id) -> Result<()>;
    async fn get_file(&self, target: &Peer, filename: &str) -> Result<Option<Vec<u8>>>;

    async fn store_posting(&self, target: &Peer, token: String, meta: FileMetadata) -> Result<()>;
    async fn lookup_token(&self, target: &Peer, token: &str) -> Result<Vec<FileMetadata>>;

    async fn transfer_arc(&self, target: &Peer, lower: Id, upper: Id) -> Result<Vec<TransferRecord>>;
    async fn delete_keys(&self, target: &Peer, filenames: Vec<String>) -> Result<()>;

    /// Push a refreshed backup snapshot to `target` (4.E/4.H case (b)):
    /// not in the minimal opcode table of the external interface spec,
    /// but required by the replication-hop behavior it describes.
    async fn push_backup(&self, target: &Peer, files: Vec<TransferRecord>) -> Result<()>;

    async fn update_successor(&self, target: &Peer, new: Option<Peer>) -> Result<()>;
    async fn update_predecessor(&self, target: &Peer, new: Option<Peer>) -> Result<()>;
}
