//! End-to-end scenarios against real in-process peers talking over
//! localhost TCP, one per the six walkthroughs this crate's behaviour is
//! checked against: ring-of-one, two-peer convergence, fan-out search,
//! failure recovery without a graceful leave, graceful leave racing a
//! concurrent search, and partial-token prefix match.

use chordite::handler::PeerRequestHandler;
use chordite::peer::{shutdown_background_tasks, spawn_background_tasks, ChorditePeer};
use chordite_core::config::Config;
use chordite_core::peer::Peer;
use chordite_net::server::Listener;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Sub-second maintenance intervals so ring convergence in tests takes
/// milliseconds instead of the production multi-second defaults.
fn test_config() -> Config {
    Config {
        m: 48,
        r: 2,
        stabilize_interval: Duration::from_millis(30),
        fix_fingers_interval: Duration::from_millis(40),
        check_predecessor_interval: Duration::from_millis(50),
        heartbeat_interval: Duration::from_secs(3600),
        heartbeat_timeout: Duration::from_secs(3600),
        net_timeout: Duration::from_secs(2),
        suspect_threshold: 2,
        drain_timeout: Duration::from_millis(200),
    }
}

struct TestPeer {
    peer: Arc<ChorditePeer>,
    listener: Option<Listener>,
    tasks: Vec<compio::runtime::Task<()>>,
    stopping: Arc<AtomicBool>,
}

impl TestPeer {
    async fn spawn(config: Config, seed: Option<Peer>) -> Self {
        let port = portpicker::pick_unused_port().expect("free port");
        let space = config.id_space();
        let self_peer = Peer::new(space, "127.0.0.1", port);
        let peer = ChorditePeer::from_parts(self_peer, config, None);

        peer.ring.join(seed).await.expect("join ring");
        if let Some(successor) = Some(peer.ring.successor()).filter(|s| *s != peer.self_peer) {
            let lower = match peer.transport.get_predecessor(&successor).await {
                Ok(Some(pred)) => pred.id,
                _ => peer.self_peer.id,
            };
            peer.rehash.pull_from_successor(&successor, lower, peer.self_peer.id).await;
        }

        let handler = Arc::new(PeerRequestHandler::new(
            Arc::clone(&peer.ring),
            Arc::clone(&peer.store),
            Arc::clone(&peer.index),
            Arc::clone(&peer.rehash),
            Arc::clone(&peer.transport),
        ));
        let listener = Listener::bind(&peer.self_peer.addr(), handler, 4, 64, Duration::from_secs(2))
            .await
            .expect("bind");

        let stopping = Arc::new(AtomicBool::new(false));
        let tasks = spawn_background_tasks(Arc::clone(&peer), Arc::clone(&stopping));

        Self { peer, listener: Some(listener), tasks, stopping }
    }

    fn addr(&self) -> Peer {
        self.peer.self_peer.clone()
    }

    async fn shutdown(mut self) {
        self.stopping.store(true, std::sync::atomic::Ordering::SeqCst);
        shutdown_background_tasks(std::mem::take(&mut self.tasks), &self.stopping, Duration::from_millis(200)).await;
        if let Some(listener) = self.listener.take() {
            listener.shutdown(Duration::from_millis(200)).await;
        }
    }
}

async fn converge(rounds: usize) {
    compio::time::sleep(Duration::from_millis(30) * rounds as u32).await;
}

#[test]
fn ring_of_one_put_get_search() {
    let rt = compio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let node = TestPeer::spawn(test_config(), None).await;

        let owner = node.peer.put("alpha.txt", b"AAA".to_vec()).await.unwrap();
        assert_eq!(owner, node.addr());

        let bytes = node.peer.get("alpha.txt").await.unwrap();
        assert_eq!(bytes, b"AAA".to_vec());

        let hits = node.peer.search("alpha").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "alpha.txt");
        assert!((hits[0].score - 1.0).abs() < f32::EPSILON);

        node.shutdown().await;
    });
}

#[test]
fn two_peer_ring_converges_and_serves_each_others_keys() {
    let rt = compio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let founder = TestPeer::spawn(test_config(), None).await;
        let joiner = TestPeer::spawn(test_config(), Some(founder.addr())).await;

        converge(8).await;

        assert_ne!(founder.peer.ring.successor(), founder.addr());
        assert_ne!(joiner.peer.ring.successor(), joiner.addr());
        assert_eq!(founder.peer.ring.successor(), joiner.addr());
        assert_eq!(joiner.peer.ring.successor(), founder.addr());

        let owner = joiner.peer.put("shared.txt", b"hello".to_vec()).await.unwrap();
        let bytes = founder.peer.get("shared.txt").await.unwrap();
        assert_eq!(bytes, b"hello".to_vec());
        assert!(owner == founder.addr() || owner == joiner.addr());

        founder.shutdown().await;
        joiner.shutdown().await;
    });
}

#[test]
fn fan_out_search_across_three_peers() {
    let rt = compio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let a = TestPeer::spawn(test_config(), None).await;
        let b = TestPeer::spawn(test_config(), Some(a.addr())).await;
        let c = TestPeer::spawn(test_config(), Some(a.addr())).await;
        converge(12).await;

        a.peer.put("machine_learning_notes.txt", b"x".to_vec()).await.unwrap();
        b.peer.put("deep_learning_tutorial.pdf", b"y".to_vec()).await.unwrap();
        c.peer.put("neural_network_basics.doc", b"z".to_vec()).await.unwrap();
        converge(4).await;

        let learning_hits = a.peer.search("learning").await.unwrap();
        let learning_names: Vec<_> = learning_hits.iter().map(|h| h.filename.clone()).collect();
        assert_eq!(learning_names, vec!["deep_learning_tutorial.pdf", "machine_learning_notes.txt"]);
        assert!(learning_hits.iter().all(|h| (h.score - 1.0).abs() < f32::EPSILON));

        let neural_hits = b.peer.search("neural").await.unwrap();
        assert_eq!(neural_hits.len(), 1);
        assert_eq!(neural_hits[0].filename, "neural_network_basics.doc");

        a.shutdown().await;
        b.shutdown().await;
        c.shutdown().await;
    });
}

#[test]
fn get_survives_primary_failure_via_backup_replica() {
    let rt = compio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let founder = TestPeer::spawn(test_config(), None).await;
        let joiner = TestPeer::spawn(test_config(), Some(founder.addr())).await;
        converge(8).await;

        let owner_addr = joiner.peer.put("vanish.txt", b"gone-soon".to_vec()).await.unwrap();
        converge(2).await;

        let (owner, survivor) = if owner_addr == founder.addr() { (founder, joiner) } else { (joiner, founder) };

        owner.shutdown().await;
        converge(10).await;

        let bytes = survivor.peer.get("vanish.txt").await.unwrap();
        assert_eq!(bytes, b"gone-soon".to_vec());
    });
}

#[test]
fn graceful_leave_never_fabricates_search_results() {
    let rt = compio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let p1 = TestPeer::spawn(test_config(), None).await;
        let p2 = TestPeer::spawn(test_config(), Some(p1.addr())).await;
        let p3 = TestPeer::spawn(test_config(), Some(p1.addr())).await;
        let p4 = TestPeer::spawn(test_config(), Some(p1.addr())).await;
        converge(16).await;

        p1.peer.put("data_one.csv", b"1".to_vec()).await.unwrap();
        p2.peer.put("data_two.csv", b"2".to_vec()).await.unwrap();
        p3.peer.put("data_three.csv", b"3".to_vec()).await.unwrap();
        p4.peer.put("data_four.csv", b"4".to_vec()).await.unwrap();
        converge(4).await;

        let before = p1.peer.search("data").await.unwrap();
        let before_names: std::collections::BTreeSet<_> = before.iter().map(|h| h.filename.clone()).collect();
        assert_eq!(before_names.len(), 4);

        let (leave_fut, during_fut) = futures::join!(p4.peer.leave(), p1.peer.search("data"));
        leave_fut.unwrap();
        let during_names: std::collections::BTreeSet<_> =
            during_fut.unwrap().into_iter().map(|h| h.filename).collect();
        assert!(during_names.is_subset(&before_names));

        converge(16).await;
        let after = p1.peer.search("data").await.unwrap();
        let after_names: std::collections::BTreeSet<_> = after.iter().map(|h| h.filename).collect();
        assert_eq!(after_names, before_names);

        p1.shutdown().await;
        p2.shutdown().await;
        p3.shutdown().await;
    });
}

#[test]
fn partial_token_prefix_matches_full_token() {
    let rt = compio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let node = TestPeer::spawn(test_config(), None).await;
        node.peer.put("machine_learning_notes.txt", b"content".to_vec()).await.unwrap();

        let hits = node.peer.search("mach").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "machine_learning_notes.txt");

        node.shutdown().await;
    });
}
