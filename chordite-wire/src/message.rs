//! Typed message variants for every opcode the core requires.
//!
//! Tagged by `serde`'s internal enum tagging (`{"type": "...", ...}`),
//! never positional — the duck-typed whitespace-token framing the source
//! uses is exactly what this replaces (see the design notes on
//! tagged-variant messages).

use chordite_core::id::Id;
use chordite_core::index::FileMetadata;
use chordite_core::peer::Peer;
use chordite_core::store::TransferRecord;
use serde::{Deserialize, Serialize};

/// Requests a peer may receive from another peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    FindSuccessor { key_id: Id },
    GetPredecessor,
    GetSuccessor,
    Notify { candidate: Peer },
    Ping,
    StoreFile { filename: String, bytes: Vec<u8>, key: Id },
    GetFile { filename: String },
    StorePosting { token: String, meta: FileMetadata },
    LookupToken { token: String },
    TransferArc { lower: Id, upper: Id },
    DeleteKeys { filenames: Vec<String> },
    UpdateSuccessor { new: Option<Peer> },
    UpdatePredecessor { new: Option<Peer> },
    PushBackup { files: Vec<TransferRecord> },
}

/// Responses a peer sends back. Each variant lines up with the request
/// that produced it; `Error` is shared across all opcodes per the error
/// taxonomy (invalid input rejects the request without mutating state).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Peer { peer: Peer },
    MaybePeer { peer: Option<Peer> },
    Ack,
    FileBytes { bytes: Vec<u8> },
    NotFound,
    Postings { postings: Vec<FileMetadata> },
    Records { records: Vec<TransferRecord> },
    Error { message: String },
}

impl Response {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

/// Bootstrap registry wire messages (4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryRequest {
    Register { host: String, port: u16 },
    Unregister { host: String, port: u16 },
    Heartbeat { host: String, port: u16 },
    ListPeers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryResponse {
    Joined { peers: Vec<Peer> },
    Full,
    AlreadyRegistered,
    Ok,
    NotFound,
    Unknown,
    Peers { peers: Vec<Peer> },
}
