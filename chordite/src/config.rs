//! CLI configuration for the peer process, covering every knob in §6's
//! Configuration list. Parsed with `clap` (the one CLI dependency
//! anywhere in this workspace per SPEC_FULL's "minimal process entry
//! points" note — no subcommands, just flags).

use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "chordite-peer", version, about = "Chordite DHT peer")]
pub struct PeerArgs {
    /// Address to bind the RPC listener on.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Port to bind the RPC listener on.
    #[arg(short, long)]
    pub port: u16,

    /// Host other peers should use to reach this one (defaults to
    /// `127.0.0.1` when `bind_host` is a wildcard address, since that
    /// can't be dialed).
    #[arg(long)]
    pub advertise_host: Option<String>,

    /// Existing peer (`host:port`) used as the `join` seed. Omit to
    /// found a new ring.
    #[arg(long)]
    pub seed: Option<String>,

    /// Bootstrap registry address (`host:port`). Omit to skip
    /// registration; `join` then requires `--seed`.
    #[arg(long)]
    pub bootstrap: Option<String>,

    /// Id-space bit width.
    #[arg(long, default_value_t = chordite_core::id::DEFAULT_M)]
    pub m: u32,

    /// File replication factor (primary + r-1 replicas).
    #[arg(long, default_value_t = 2)]
    pub r: usize,

    /// Worker pool size for inbound RPC dispatch.
    #[arg(long, default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Bounded dispatch queue depth before inbound connections are shed.
    #[arg(long, default_value_t = 256)]
    pub queue_depth: usize,

    #[arg(long, default_value_t = 2)]
    pub stabilize_interval_secs: u64,

    #[arg(long, default_value_t = 3)]
    pub fix_fingers_interval_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub check_predecessor_interval_secs: u64,

    #[arg(long, default_value_t = 3)]
    pub heartbeat_interval_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub heartbeat_timeout_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub net_timeout_secs: u64,

    #[arg(long, default_value_t = 500)]
    pub drain_timeout_ms: u64,
}

impl PeerArgs {
    #[must_use]
    pub fn advertise_host(&self) -> String {
        self.advertise_host.clone().unwrap_or_else(|| {
            if self.bind_host == "0.0.0.0" || self.bind_host == "::" {
                "127.0.0.1".to_string()
            } else {
                self.bind_host.clone()
            }
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    #[must_use]
    pub fn advertise_addr(&self) -> String {
        format!("{}:{}", self.advertise_host(), self.port)
    }

    #[must_use]
    pub fn core_config(&self) -> chordite_core::config::Config {
        chordite_core::config::Config {
            m: self.m,
            r: if self.r == 0 { 1 } else { self.r },
            stabilize_interval: Duration::from_secs(self.stabilize_interval_secs),
            fix_fingers_interval: Duration::from_secs(self.fix_fingers_interval_secs),
            check_predecessor_interval: Duration::from_secs(self.check_predecessor_interval_secs),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(self.heartbeat_timeout_secs),
            net_timeout: Duration::from_secs(self.net_timeout_secs),
            suspect_threshold: chordite_core::config::Config::default().suspect_threshold,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        }
    }
}
