use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Built frontend to serve at `/` (SPA assets)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// Outbound connections to the media host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound on the HEAD probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Longest gap between two relayed chunks before the relay is abandoned
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How long a stream request waits for a free connection slot
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Concurrent stream requests allowed to hold upstream connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Route media fetches through this HTTP(S) proxy
    #[serde(default)]
    pub proxy_url: Option<String>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_connect_timeout() -> u64 {
    30
}
fn default_probe_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    60
}
fn default_acquire_timeout() -> u64 {
    10
}
fn default_max_connections() -> usize {
    64
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            max_connections: default_max_connections(),
            proxy_url: None,
            user_agent: None,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Page size when the client sends no `limit`
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Larger `limit` values are capped to this
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    50
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}
