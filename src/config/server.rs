//! Server timing configuration types.

use super::defaults::{
    default_countdown_seconds, default_heartbeat_interval_secs, default_ping_timeout_secs,
};
use serde::{Deserialize, Serialize};

/// Timing knobs for the connection/room lifecycle.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interval between heartbeat sweeps over all connections (seconds).
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence before a connection is forcibly terminated.
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    /// Whole seconds counted down before a race transitions to `in_progress`.
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            countdown_seconds: default_countdown_seconds(),
        }
    }
}
