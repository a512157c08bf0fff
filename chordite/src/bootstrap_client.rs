//! Client for the bootstrap registry's own wire contract
//! (`RegistryRequest`/`RegistryResponse`), separate from the ring RPC
//! contract `chordite-net::client::TcpTransport` speaks. Same
//! connection-per-call shape, smaller opcode set.

use crate::error::{ChorditeError, Result};
use chordite_net::framing::{read_message, write_message};
use chordite_net::tcp::enable_tcp_nodelay;
use chordite_wire::message::{RegistryRequest, RegistryResponse};
use compio::net::TcpStream;
use compio::time::timeout;
use std::time::Duration;

pub struct BootstrapClient {
    addr: String,
    net_timeout: Duration,
}

impl BootstrapClient {
    #[must_use]
    pub fn new(addr: impl Into<String>, net_timeout: Duration) -> Self {
        Self { addr: addr.into(), net_timeout }
    }

    async fn call(&self, req: RegistryRequest) -> Result<RegistryResponse> {
        let mut stream = timeout(self.net_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ChorditeError::Bootstrap(format!("{}: connect timed out", self.addr)))?
            .map_err(|e| ChorditeError::Bootstrap(format!("{}: {e}", self.addr)))?;
        let _ = enable_tcp_nodelay(&stream);

        write_message(&mut stream, &req, self.net_timeout).await?;
        Ok(read_message(&mut stream, self.net_timeout).await?)
    }

    /// Register `(host, port)` and return the seed peers the registry
    /// already knew about.
    pub async fn register(&self, host: &str, port: u16) -> Result<Vec<chordite_core::peer::Peer>> {
        match self.call(RegistryRequest::Register { host: host.to_string(), port }).await? {
            RegistryResponse::Joined { peers } => Ok(peers),
            RegistryResponse::Full => Err(ChorditeError::Bootstrap("registry full".into())),
            RegistryResponse::AlreadyRegistered => Err(ChorditeError::Bootstrap("already registered".into())),
            other => Err(ChorditeError::Bootstrap(format!("unexpected response to register: {other:?}"))),
        }
    }

    pub async fn unregister(&self, host: &str, port: u16) -> Result<()> {
        match self.call(RegistryRequest::Unregister { host: host.to_string(), port }).await? {
            RegistryResponse::Ok | RegistryResponse::NotFound => Ok(()),
            other => Err(ChorditeError::Bootstrap(format!("unexpected response to unregister: {other:?}"))),
        }
    }

    /// `true` if the registry already knew this peer (a `false` return
    /// means it restarted and lost state, and the caller should
    /// re-register).
    pub async fn heartbeat(&self, host: &str, port: u16) -> Result<bool> {
        match self.call(RegistryRequest::Heartbeat { host: host.to_string(), port }).await? {
            RegistryResponse::Ok => Ok(true),
            RegistryResponse::Unknown => Ok(false),
            other => Err(ChorditeError::Bootstrap(format!("unexpected response to heartbeat: {other:?}"))),
        }
    }

    pub async fn list_peers(&self) -> Result<Vec<chordite_core::peer::Peer>> {
        match self.call(RegistryRequest::ListPeers).await? {
            RegistryResponse::Peers { peers } => Ok(peers),
            other => Err(ChorditeError::Bootstrap(format!("unexpected response to list_peers: {other:?}"))),
        }
    }
}
