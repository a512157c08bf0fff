//! Thin process entry point: parse args, init logging, build the peer,
//! join the ring, bind the RPC listener, run maintenance loops until
//! killed. `put`/`get`/`search`/`leave` are library calls other
//! processes (or a future CLI adapter) drive over the same RPC
//! contract — this binary only serves, per SPEC_FULL's "minimal process
//! entry points" note.

use chordite::config::PeerArgs;
use chordite::handler::PeerRequestHandler;
use chordite::peer::{spawn_background_tasks, ChorditePeer};
use chordite_net::server::Listener;
use clap::Parser;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[compio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("chordite=info".parse().unwrap()),
        )
        .init();

    let args = PeerArgs::parse();
    let peer = ChorditePeer::new(&args);

    peer.join(&args).await.expect("join ring");

    let handler = Arc::new(PeerRequestHandler::new(
        Arc::clone(&peer.ring),
        Arc::clone(&peer.store),
        Arc::clone(&peer.index),
        Arc::clone(&peer.rehash),
        Arc::clone(&peer.transport),
    ));

    let bind_addr = args.bind_addr();
    let listener = Listener::bind(
        &bind_addr,
        handler,
        args.workers.max(1),
        args.queue_depth,
        Duration::from_secs(args.net_timeout_secs),
    )
    .await
    .expect("bind peer RPC listener");
    info!(bind_addr, advertise = %peer.self_peer, "chordite peer listening");

    let stopping = Arc::new(AtomicBool::new(false));
    let tasks = spawn_background_tasks(Arc::clone(&peer), Arc::clone(&stopping));

    // Holds the listener's accept loop and worker pool alive for the
    // life of the process; like the bootstrap registry binary, this one
    // has no signal-driven graceful shutdown wired up, so `leave()` is a
    // library call for whatever supervises this process (or a test
    // harness) to invoke before terminating it.
    let _listener = listener;

    futures::future::join_all(tasks).await;
}
