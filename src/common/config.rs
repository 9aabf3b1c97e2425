//! Configuration for minikv-admin nodes

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Minimum accepted length of the shared access key
pub const ACCESS_KEY_MIN_LEN: usize = 3;
/// Minimum accepted length of the shared secret key
pub const SECRET_KEY_MIN_LEN: usize = 8;

/// Environment prefix for overrides, e.g. `MINIKV_ADMIN_SECURE=true`
const ENV_PREFIX: &str = "MINIKV_ADMIN";

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node ID (unique identifier)
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Address this node is known by in the cluster (host:port)
    #[serde(default = "default_address")]
    pub address: String,

    /// Bind address for the admin RPC endpoint
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Cluster endpoints (URLs), self included or not
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Shared credential: access key
    #[serde(default)]
    pub access_key: String,

    /// Shared credential: secret key
    #[serde(default)]
    pub secret_key: String,

    /// Use https for peer RPC
    #[serde(default)]
    pub secure: bool,

    /// Per-call deadline for peer RPC
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_ms: u64,

    /// Capacity of the service signal channel
    #[serde(default = "default_signal_buffer")]
    pub signal_buffer: usize,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "node-1".to_string()
}
fn default_address() -> String {
    "127.0.0.1:9000".to_string()
}
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9000))
}
fn default_rpc_timeout() -> u64 {
    10_000
}
fn default_signal_buffer() -> usize {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            address: default_address(),
            bind_addr: default_bind_addr(),
            endpoints: Vec::new(),
            access_key: String::new(),
            secret_key: String::new(),
            secure: false,
            rpc_timeout_ms: default_rpc_timeout(),
            signal_buffer: default_signal_buffer(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then `MINIKV_ADMIN_*` environment
    /// variables. Missing keys fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("endpoints"),
        );
        let cfg: Config = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    /// Reject configurations the admin plane cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::InvalidConfig("address must not be empty".into()));
        }
        if self.access_key.len() < ACCESS_KEY_MIN_LEN {
            return Err(Error::InvalidConfig(format!(
                "access key must be at least {} characters",
                ACCESS_KEY_MIN_LEN
            )));
        }
        if self.secret_key.len() < SECRET_KEY_MIN_LEN {
            return Err(Error::InvalidConfig(format!(
                "secret key must be at least {} characters",
                SECRET_KEY_MIN_LEN
            )));
        }
        if self.signal_buffer == 0 {
            return Err(Error::InvalidConfig("signal_buffer must be > 0".into()));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(Error::InvalidConfig("rpc_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}
