//! Wires the ring (`Ring`/`FileStore`/`InvertedIndex`) up to
//! `chordite-net`'s generic `RequestHandler` for the ring RPC contract.
//! One request in, one response out; every opcode either answers from
//! local state or forwards a single hop through the provided transport
//! (`find_successor`'s `RouteDecision::Forward` case) — multi-hop
//! resolution itself lives in `Ring::find_successor`, which callers
//! outside this process use directly.

use async_trait::async_trait;
use chordite_core::id::in_right_closed;
use chordite_core::index::{FileMetadata, InvertedIndex};
use chordite_core::rehash::RehashEngine;
use chordite_core::ring::{Ring, RouteDecision};
use chordite_core::store::TransferRecord;
use chordite_core::store::{File, FileStore};
use chordite_core::tokenizer::tokenize;
use chordite_core::transport::Transport;
use chordite_net::server::RequestHandler;
use chordite_wire::message::{Request, Response};
use std::sync::Arc;
use tracing::debug;

pub struct PeerRequestHandler {
    ring: Arc<Ring>,
    store: Arc<FileStore>,
    index: Arc<InvertedIndex>,
    rehash: Arc<RehashEngine>,
    transport: Arc<dyn Transport>,
}

impl PeerRequestHandler {
    #[must_use]
    pub fn new(
        ring: Arc<Ring>,
        store: Arc<FileStore>,
        index: Arc<InvertedIndex>,
        rehash: Arc<RehashEngine>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self { ring, store, index, rehash, transport }
    }
}

#[async_trait]
impl RequestHandler for PeerRequestHandler {
    type Request = Request;
    type Response = Response;

    async fn handle(&self, req: Request) -> Response {
        match req {
            Request::FindSuccessor { key_id } => match self.ring.route_locally(key_id) {
                RouteDecision::Answer(peer) => Response::Peer { peer },
                RouteDecision::Forward(next) => match self.transport.find_successor(&next, key_id).await {
                    Ok(peer) => Response::Peer { peer },
                    Err(e) => Response::error(e.to_string()),
                },
            },

            Request::GetPredecessor => Response::MaybePeer { peer: self.ring.predecessor() },
            Request::GetSuccessor => Response::MaybePeer { peer: Some(self.ring.successor()) },

            Request::Notify { candidate } => {
                self.ring.notify(candidate);
                Response::Ack
            }

            Request::Ping => Response::Ack,

            Request::StoreFile { filename, bytes, key } => {
                let bytes_arc: Arc<[u8]> = Arc::from(bytes.as_slice());
                self.store.put_primary(filename.clone(), Arc::clone(&bytes_arc), key);

                // 4.G's "also push to the backup slot of successor" hop:
                // piggybacks on the store itself rather than waiting for
                // the next stabilize round, so a freshly stored file has
                // a backup immediately instead of only after a successor
                // change.
                let successor = self.ring.successor();
                if successor != self.ring.self_peer {
                    self.rehash.push_backup(&successor).await;
                }

                // 4.G's index fan-out: this runs at the primary node, so
                // it belongs in the handler rather than the client.
                let tokens = tokenize(&filename);
                if !tokens.is_empty() {
                    let meta = FileMetadata {
                        filename: filename.clone(),
                        file_key: key,
                        origin_node_id: self.ring.self_peer.id,
                        origin_node_addr: self.ring.self_peer.addr(),
                        all_tokens: tokens.iter().cloned().collect(),
                        size: bytes_arc.len() as u64,
                    };
                    for token in tokens {
                        let token_key = self.ring.space.hash_str(&token);
                        match self.ring.find_successor(token_key).await {
                            Ok(owner) => {
                                if let Err(e) =
                                    self.transport.store_posting(&owner, token.clone(), meta.clone()).await
                                {
                                    debug!(token = %token, error = %e, "store_file: posting placement failed, orphan tolerated");
                                }
                            }
                            Err(e) => {
                                debug!(token = %token, error = %e, "store_file: token owner resolution failed");
                            }
                        }
                    }
                }

                Response::Ack
            }

            Request::GetFile { filename } => match self.store.retrieve(&filename) {
                Some(bytes) => Response::FileBytes { bytes: bytes.to_vec() },
                None => Response::NotFound,
            },

            Request::StorePosting { token, meta } => {
                self.index.upsert(token, meta);
                Response::Ack
            }

            Request::LookupToken { token } => Response::Postings { postings: self.index.lookup(&token) },

            Request::TransferArc { lower, upper } => {
                let records = self
                    .store
                    .scan_arc(|k| in_right_closed(k, lower, upper))
                    .iter()
                    .map(TransferRecord::from)
                    .collect();
                Response::Records { records }
            }

            Request::DeleteKeys { filenames } => {
                self.store.delete_primary(&filenames);
                Response::Ack
            }

            Request::UpdateSuccessor { new } => {
                self.ring.apply_new_successor(new);
                Response::Ack
            }

            Request::UpdatePredecessor { new } => {
                self.ring.apply_new_predecessor(new);
                Response::Ack
            }

            Request::PushBackup { files } => {
                let files: Vec<File> = files
                    .into_iter()
                    .map(|r| File { filename: r.filename, bytes: Arc::from(r.bytes.as_slice()), key: r.key })
                    .collect();
                self.store.replace_backup(files);
                Response::Ack
            }
        }
    }

    fn shed_response(&self) -> Response {
        debug!("dispatch queue saturated, shedding inbound RPC");
        Response::error("busy")
    }
}
