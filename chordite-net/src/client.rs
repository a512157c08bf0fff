//! `chordite_core::transport::Transport` over TCP: a connection-per-call
//! RPC client.
//!
//! The contract only requires request/response semantics with per-
//! connection FIFO (§4.B); it does not require connection reuse, so this
//! dials fresh each call. That keeps failure handling simple (a dead
//! peer just fails to connect) at the cost of a handshake per RPC —
//! acceptable at Chord's request rate. Grounded on the teacher's
//! `monocoque-zmtp/src/handshake.rs` synchronous-request-then-response
//! shape, generalized from a one-time ZMTP handshake to every RPC.

use crate::error::{NetError, Result as NetResult};
use crate::framing::{read_message, write_message};
use crate::tcp::enable_tcp_nodelay;
use async_trait::async_trait;
use chordite_core::error::{CoreError, Result as CoreResult};
use chordite_core::id::Id;
use chordite_core::index::FileMetadata;
use chordite_core::peer::Peer;
use chordite_core::store::TransferRecord;
use chordite_core::transport::Transport;
use chordite_wire::message::{Request, Response};
use compio::net::TcpStream;
use compio::time::timeout;
use std::time::Duration;
use tracing::debug;

/// TCP-backed [`Transport`]. One instance is shared (via `Arc`) by a
/// peer's ring, rehash engine, and index fan-out.
pub struct TcpTransport {
    net_timeout: Duration,
}

impl TcpTransport {
    #[must_use]
    pub const fn new(net_timeout: Duration) -> Self {
        Self { net_timeout }
    }

    async fn connect(&self, target: &Peer) -> NetResult<TcpStream> {
        let stream = timeout(self.net_timeout, TcpStream::connect(target.addr()))
            .await
            .map_err(|_| NetError::Timeout(self.net_timeout))?
            .map_err(NetError::Connect)?;
        let _ = enable_tcp_nodelay(&stream);
        Ok(stream)
    }

    async fn call(&self, target: &Peer, req: Request) -> NetResult<Response> {
        let mut stream = self.connect(target).await?;
        write_message(&mut stream, &req, self.net_timeout).await?;
        read_message(&mut stream, self.net_timeout).await
    }
}

/// Map a transport-layer failure onto the core taxonomy: every net
/// failure here demotes the peer to "suspect" from the caller's point of
/// view (§7), so they all become [`CoreError::PeerUnreachable`] except
/// an explicit remote error payload, which core treats as invalid input.
fn to_core_err(target: &Peer, e: NetError) -> CoreError {
    match e {
        NetError::Remote(msg) => CoreError::InvalidInput(msg),
        other => CoreError::PeerUnreachable(format!("{}: {other}", target.addr())),
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn find_successor(&self, target: &Peer, key: Id) -> CoreResult<Peer> {
        match self.call(target, Request::FindSuccessor { key_id: key }).await {
            Ok(Response::Peer { peer }) => Ok(peer),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to find_successor".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn get_predecessor(&self, target: &Peer) -> CoreResult<Option<Peer>> {
        match self.call(target, Request::GetPredecessor).await {
            Ok(Response::MaybePeer { peer }) => Ok(peer),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to get_predecessor".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn get_successor(&self, target: &Peer) -> CoreResult<Option<Peer>> {
        match self.call(target, Request::GetSuccessor).await {
            Ok(Response::MaybePeer { peer }) => Ok(peer),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to get_successor".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn notify(&self, target: &Peer, candidate: Peer) -> CoreResult<()> {
        match self.call(target, Request::Notify { candidate }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to notify".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn ping(&self, target: &Peer) -> CoreResult<()> {
        match self.call(target, Request::Ping).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to ping".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn store_file(&self, target: &Peer, filename: String, bytes: Vec<u8>, key: Id) -> CoreResult<()> {
        match self.call(target, Request::StoreFile { filename, bytes, key }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to store_file".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn get_file(&self, target: &Peer, filename: &str) -> CoreResult<Option<Vec<u8>>> {
        match self
            .call(target, Request::GetFile { filename: filename.to_string() })
            .await
        {
            Ok(Response::FileBytes { bytes }) => Ok(Some(bytes)),
            Ok(Response::NotFound) => Ok(None),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to get_file".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn store_posting(&self, target: &Peer, token: String, meta: FileMetadata) -> CoreResult<()> {
        match self.call(target, Request::StorePosting { token, meta }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to store_posting".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn lookup_token(&self, target: &Peer, token: &str) -> CoreResult<Vec<FileMetadata>> {
        match self
            .call(target, Request::LookupToken { token: token.to_string() })
            .await
        {
            Ok(Response::Postings { postings }) => Ok(postings),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to lookup_token".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn transfer_arc(&self, target: &Peer, lower: Id, upper: Id) -> CoreResult<Vec<TransferRecord>> {
        match self.call(target, Request::TransferArc { lower, upper }).await {
            Ok(Response::Records { records }) => Ok(records),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to transfer_arc".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn delete_keys(&self, target: &Peer, filenames: Vec<String>) -> CoreResult<()> {
        match self.call(target, Request::DeleteKeys { filenames }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to delete_keys".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn push_backup(&self, target: &Peer, files: Vec<TransferRecord>) -> CoreResult<()> {
        match self.call(target, Request::PushBackup { files }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to push_backup".into())),
            Err(e) => {
                debug!(target = %target, error = %e, "push_backup failed, will retry on next stabilize");
                Err(to_core_err(target, e))
            }
        }
    }

    async fn update_successor(&self, target: &Peer, new: Option<Peer>) -> CoreResult<()> {
        match self.call(target, Request::UpdateSuccessor { new }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to update_successor".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }

    async fn update_predecessor(&self, target: &Peer, new: Option<Peer>) -> CoreResult<()> {
        match self.call(target, Request::UpdatePredecessor { new }).await {
            Ok(Response::Ack) => Ok(()),
            Ok(Response::Error { message }) => Err(CoreError::InvalidInput(message)),
            Ok(_) => Err(CoreError::PeerUnreachable("unexpected response to update_predecessor".into())),
            Err(e) => Err(to_core_err(target, e)),
        }
    }
}
