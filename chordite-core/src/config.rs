//! Ring-wide configuration: id-space width, replication factor, timer
//! periods, and timeouts.

use std::time::Duration;

/// Tunables shared by every component. Defaults match the reference
/// implementation's (`chord_node_v2.py`) constants.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Id-space bit width.
    pub m: u32,
    /// File replication factor (primary + r-1 replicas). Minimum 1.
    pub r: usize,
    /// Stabilize period.
    pub stabilize_interval: Duration,
    /// Fix-fingers period.
    pub fix_fingers_interval: Duration,
    /// Check-predecessor period.
    pub check_predecessor_interval: Duration,
    /// Bootstrap heartbeat period.
    pub heartbeat_interval: Duration,
    /// Bootstrap registry eviction timeout.
    pub heartbeat_timeout: Duration,
    /// Per-request network timeout.
    pub net_timeout: Duration,
    /// Consecutive failures before a suspect peer is declared dead.
    pub suspect_threshold: u32,
    /// Grace period for in-flight requests to finish on shutdown.
    pub drain_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            m: crate::id::DEFAULT_M,
            r: 2,
            stabilize_interval: Duration::from_secs(2),
            fix_fingers_interval: Duration::from_secs(3),
            check_predecessor_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(3),
            heartbeat_timeout: Duration::from_secs(10),
            net_timeout: Duration::from_secs(5),
            suspect_threshold: 2,
            drain_timeout: Duration::from_millis(500),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn with_m(mut self, m: u32) -> Self {
        self.m = m;
        self
    }

    #[must_use]
    pub const fn with_replication(mut self, r: usize) -> Self {
        self.r = if r == 0 { 1 } else { r };
        self
    }

    #[must_use]
    pub fn id_space(&self) -> crate::id::IdSpace {
        crate::id::IdSpace::new(self.m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_intervals() {
        let cfg = Config::default();
        assert_eq!(cfg.stabilize_interval, Duration::from_secs(2));
        assert_eq!(cfg.fix_fingers_interval, Duration::from_secs(3));
        assert_eq!(cfg.check_predecessor_interval, Duration::from_secs(5));
        assert_eq!(cfg.r, 2);
    }

    #[test]
    fn replication_factor_floor_is_one() {
        let cfg = Config::default().with_replication(0);
        assert_eq!(cfg.r, 1);
    }
}
