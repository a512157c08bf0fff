//! Wires [`Registry`] up to `chordite-net`'s generic
//! [`chordite_net::server::RequestHandler`] for the
//! `RegistryRequest`/`RegistryResponse` wire contract.

use crate::registry::{RegisterOutcome, Registry};
use async_trait::async_trait;
use chordite_net::server::RequestHandler;
use chordite_wire::message::{RegistryRequest, RegistryResponse};
use std::sync::Arc;

pub struct RegistryHandler {
    registry: Arc<Registry>,
}

impl RegistryHandler {
    #[must_use]
    pub const fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl RequestHandler for RegistryHandler {
    type Request = RegistryRequest;
    type Response = RegistryResponse;

    async fn handle(&self, req: RegistryRequest) -> RegistryResponse {
        match req {
            RegistryRequest::Register { host, port } => match self.registry.register(&host, port) {
                RegisterOutcome::Joined { peers } => RegistryResponse::Joined { peers },
                RegisterOutcome::Full => RegistryResponse::Full,
                RegisterOutcome::AlreadyRegistered => RegistryResponse::AlreadyRegistered,
            },
            RegistryRequest::Unregister { host, port } => {
                if self.registry.unregister(&host, port) {
                    RegistryResponse::Ok
                } else {
                    RegistryResponse::NotFound
                }
            }
            RegistryRequest::Heartbeat { host, port } => {
                if self.registry.heartbeat(&host, port) {
                    RegistryResponse::Ok
                } else {
                    RegistryResponse::Unknown
                }
            }
            RegistryRequest::ListPeers => RegistryResponse::Peers { peers: self.registry.list_peers() },
        }
    }

    fn shed_response(&self) -> RegistryResponse {
        RegistryResponse::Unknown
    }
}
