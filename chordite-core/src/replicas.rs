//! Replica policy: deterministically enumerate the nodes holding a key's
//! replicas.
//!
//! `replicas(k) = [succ_1(k), succ_2(k), ..., succ_r(k)]` where
//! `succ_{i+1}` is the ring-successor of `succ_i`. The source uses r=2 for
//! files and r=1 (no replication) for index postings — callers pick `r`
//! per data type via [`crate::config::Config::r`].

use crate::error::Result;
use crate::peer::Peer;
use crate::transport::Transport;

/// Walk the ring forward from `owner`, collecting up to `r` peers
/// (`owner` included). Stops early if the chain loops back on itself
/// (small ring) or a hop fails — a partial chain is still usable, it just
/// means fewer live replicas than requested.
pub async fn replica_chain(transport: &dyn Transport, owner: Peer, r: usize) -> Result<Vec<Peer>> {
    let mut chain = vec![owner.clone()];
    let mut current = owner;
    while chain.len() < r.max(1) {
        match transport.get_successor(&current).await {
            Ok(Some(next)) if !chain.contains(&next) => {
                chain.push(next.clone());
                current = next;
            }
            _ => break,
        }
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeRing {
        successors: Mutex<std::collections::HashMap<u64, Peer>>,
    }

    #[async_trait]
    impl Transport for FakeRing {
        async fn find_successor(&self, _t: &Peer, _k: Id) -> Result<Peer> {
            unimplemented!()
        }
        async fn get_predecessor(&self, _t: &Peer) -> Result<Option<Peer>> {
            unimplemented!()
        }
        async fn get_successor(&self, target: &Peer) -> Result<Option<Peer>> {
            Ok(self.successors.lock().unwrap().get(&target.id.value()).cloned())
        }
        async fn notify(&self, _t: &Peer, _c: Peer) -> Result<()> {
            unimplemented!()
        }
        async fn ping(&self, _t: &Peer) -> Result<()> {
            unimplemented!()
        }
        async fn store_file(&self, _t: &Peer, _f: String, _b: Vec<u8>, _k: Id) -> Result<()> {
            unimplemented!()
        }
        async fn get_file(&self, _t: &Peer, _f: &str) -> Result<Option<Vec<u8>>> {
            unimplemented!()
        }
        async fn store_posting(&self, _t: &Peer, _tok: String, _m: crate::index::FileMetadata) -> Result<()> {
            unimplemented!()
        }
        async fn lookup_token(&self, _t: &Peer, _tok: &str) -> Result<Vec<crate::index::FileMetadata>> {
            unimplemented!()
        }
        async fn transfer_arc(&self, _t: &Peer, _l: Id, _u: Id) -> Result<Vec<crate::store::TransferRecord>> {
            unimplemented!()
        }
        async fn delete_keys(&self, _t: &Peer, _f: Vec<String>) -> Result<()> {
            unimplemented!()
        }
        async fn update_successor(&self, _t: &Peer, _n: Option<Peer>) -> Result<()> {
            unimplemented!()
        }
        async fn update_predecessor(&self, _t: &Peer, _n: Option<Peer>) -> Result<()> {
            unimplemented!()
        }
    }

    fn peer(id: u64) -> Peer {
        Peer::with_id(Id(id), "h".into(), id as u16)
    }

    #[test]
    fn chain_walks_forward_and_caps_at_r() {
        let rt = compio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut map = std::collections::HashMap::new();
            map.insert(1, peer(2));
            map.insert(2, peer(3));
            map.insert(3, peer(1)); // ring of 3, loops back
            let ring = FakeRing { successors: Mutex::new(map) };

            let chain = replica_chain(&ring, peer(1), 2).await.unwrap();
            assert_eq!(chain, vec![peer(1), peer(2)]);

            let full_loop = replica_chain(&ring, peer(1), 10).await.unwrap();
            assert_eq!(full_loop, vec![peer(1), peer(2), peer(3)]);
        });
    }
}
