//! Admin peer registry
//!
//! The registry lists every node of the cluster exactly once, the local
//! node first. It is built once per topology and replaced wholesale when
//! the topology changes.

use crate::admin::rpc_client::{AuthConfig, AuthRpcClient};
use crate::admin::runner::{CommandRunner, RemoteAdminClient};
use crate::common::{Credential, Result};
use reqwest::Url;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// One node of the cluster and the runner used to reach it.
#[derive(Clone)]
pub struct AdminPeer {
    pub addr: String,
    pub runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for AdminPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPeer").field("addr", &self.addr).finish()
    }
}

/// Ordered peers; index 0 is always the local node.
pub type AdminPeers = Vec<AdminPeer>;

/// How remote runners reach their peers.
#[derive(Debug, Clone)]
pub struct RemotePeerConfig {
    pub credential: Credential,
    /// Use https for peer RPC
    pub secure: bool,
    /// Per-call deadline
    pub rpc_timeout: Duration,
}

/// `host:port` of an endpoint. An omitted port is the scheme's default.
fn endpoint_host(ep: &Url) -> Option<String> {
    let host = ep.host_str().filter(|h| !h.is_empty())?;
    Some(match ep.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// `local_addr` in the same `host:port` form as endpoint keys.
fn local_key(local_addr: &str, secure: bool) -> String {
    let scheme = if secure { "https" } else { "http" };
    Url::parse(&format!("{}://{}", scheme, local_addr))
        .ok()
        .as_ref()
        .and_then(endpoint_host)
        .unwrap_or_else(|| local_addr.to_string())
}

/// Build the registry: the local peer first, then one remote peer per
/// distinct endpoint host. Endpoints without a host and hosts already seen
/// (the local address included) are skipped.
pub fn make_admin_peers(
    local_addr: &str,
    local: Arc<dyn CommandRunner>,
    endpoints: &[Url],
    remote: &RemotePeerConfig,
) -> Result<AdminPeers> {
    let mut peers = vec![AdminPeer {
        addr: local_addr.to_string(),
        runner: local,
    }];
    let mut seen_addr = HashSet::from([local_key(local_addr, remote.secure)]);

    let http = AuthRpcClient::http_client(remote.rpc_timeout)?;
    for host in endpoints.iter().filter_map(endpoint_host) {
        if !seen_addr.insert(host.clone()) {
            continue;
        }
        let cfg = AuthConfig::admin(remote.credential.clone(), host.clone(), remote.secure);
        let runner = RemoteAdminClient::new(AuthRpcClient::new(cfg, http.clone()));
        peers.push(AdminPeer {
            addr: host,
            runner: Arc::new(runner),
        });
    }

    tracing::info!(peers = peers.len(), "admin peer registry built");
    Ok(peers)
}

/// Holder of the current registry. Readers take a snapshot; a topology
/// change swaps in a whole new registry.
#[derive(Debug)]
pub struct PeerRegistry {
    peers: RwLock<Arc<AdminPeers>>,
}

impl PeerRegistry {
    pub fn new(peers: AdminPeers) -> Self {
        Self {
            peers: RwLock::new(Arc::new(peers)),
        }
    }

    pub fn snapshot(&self) -> Arc<AdminPeers> {
        Arc::clone(&self.peers.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, peers: AdminPeers) {
        let mut current = self.peers.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            old = current.len(),
            new = peers.len(),
            "admin peer registry replaced"
        );
        *current = Arc::new(peers);
    }
}
