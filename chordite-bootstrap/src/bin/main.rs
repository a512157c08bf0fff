//! Thin process entry point for the bootstrap registry: parse args,
//! init logging, bind the listener, run the sweep loop until killed.
//! No subcommands — `register`/`list-peers` etc. are RPCs a peer issues,
//! not CLI verbs this binary exposes.

use chordite_bootstrap::handler::RegistryHandler;
use chordite_bootstrap::registry::{Registry, RegistryConfig};
use chordite_net::server::Listener;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "chordite-bootstrap", version, about = "Chordite bootstrap registry")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 9600)]
    port: u16,

    /// Id-space bit width (must match the ring's `m`).
    #[arg(long, default_value_t = chordite_core::id::DEFAULT_M)]
    m: u32,

    /// Maximum concurrently registered peers.
    #[arg(long, default_value_t = 4096)]
    max_peers: usize,

    /// Heartbeat liveness timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    heartbeat_timeout_secs: u64,

    /// Sweep interval, in seconds.
    #[arg(long, default_value_t = 3)]
    sweep_interval_secs: u64,

    /// Worker pool size for inbound RPC dispatch.
    #[arg(long, default_value_t = num_cpus::get())]
    workers: usize,
}

#[compio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("chordite_bootstrap=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = RegistryConfig {
        m: args.m,
        max_peers: args.max_peers,
        heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout_secs),
    };
    let registry = Arc::new(Registry::new(config));
    let handler = Arc::new(RegistryHandler::new(Arc::clone(&registry)));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = Listener::bind(&addr, handler, args.workers.max(1), 256, Duration::from_secs(5))
        .await
        .expect("bind bootstrap registry listener");
    info!(addr, "bootstrap registry listening");

    // Holds the listener's accept loop and worker pool alive for the
    // life of the process; this binary has no graceful-shutdown signal
    // wired up (that is an operational concern for whatever supervises
    // it, not the registry's own logic).
    let _listener = listener;

    let sweep_interval = Duration::from_secs(args.sweep_interval_secs);
    loop {
        compio::time::sleep(sweep_interval).await;
        let pruned = registry.sweep();
        if pruned > 0 {
            info!(pruned, remaining = registry.len(), "sweep pruned stale registrations");
        }
    }
}
