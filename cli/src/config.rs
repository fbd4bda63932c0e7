//! Persisted host settings.

use anyhow::Context;
use holotrace_core::timekeeping::{DEFAULT_NTP_SERVERS, DEFAULT_NTP_TIMEOUT_MS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// NTP servers tried in order during synchronization.
    pub ntp_servers: Vec<String>,
    /// Receive timeout per server, in milliseconds.
    pub ntp_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ntp_servers: DEFAULT_NTP_SERVERS.iter().map(|s| s.to_string()).collect(),
            ntp_timeout_ms: DEFAULT_NTP_TIMEOUT_MS,
        }
    }
}

impl HostConfig {
    pub fn load() -> anyhow::Result<Self> {
        confy::load("holotrace", "config").context("failed to load configuration")
    }
}
