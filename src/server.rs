//! Admin node server

use crate::admin::rpc_server::{create_router, AdminRpcState};
use crate::admin::service::ServiceSignalReceiver;
use crate::admin::{
    list_peer_locks_info, make_admin_peers, send_service_cmd, service_signal_channel, AdminPeers,
    CommandRunner, LocalAdminClient, PeerRegistry, RemotePeerConfig, ServiceSignal,
};
use crate::common::{Config, Credential, Error, Result};
use crate::lock::{get_system_lock_state, NsLockMap, SystemLockState, VolumeLockInfo};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

/// Parse the configured cluster endpoints.
pub fn parse_endpoints(raw: &[String]) -> Result<Vec<Url>> {
    raw.iter()
        .map(|ep| {
            Url::parse(ep).map_err(|e| Error::InvalidConfig(format!("endpoint {}: {}", ep, e)))
        })
        .collect()
}

/// One node of the admin plane.
///
/// The lock table and the service signal channel live as long as the node.
/// The peer registry is rebuilt from the configured endpoints on every
/// restart.
pub struct AdminNode {
    config: Config,
    credential: Credential,
    locks: Arc<NsLockMap>,
    local: Arc<dyn CommandRunner>,
    registry: PeerRegistry,
    signal_rx: Mutex<ServiceSignalReceiver>,
}

impl AdminNode {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let credential = Credential::new(&config.access_key, &config.secret_key);
        let locks = Arc::new(NsLockMap::new());
        let (signals, signal_rx) = service_signal_channel(config.signal_buffer);
        let local: Arc<dyn CommandRunner> =
            Arc::new(LocalAdminClient::new(signals, Arc::clone(&locks)));
        let peers = build_peers(&config, &credential, Arc::clone(&local))?;

        Ok(Self {
            config,
            credential,
            locks,
            local,
            registry: PeerRegistry::new(peers),
            signal_rx: Mutex::new(signal_rx),
        })
    }

    /// Lock table the lock-acquisition path records into.
    pub fn locks(&self) -> Arc<NsLockMap> {
        Arc::clone(&self.locks)
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Rebuild the peer registry from the configured endpoints.
    pub fn reload_peers(&self) -> Result<()> {
        let peers = build_peers(&self.config, &self.credential, Arc::clone(&self.local))?;
        self.registry.replace(peers);
        Ok(())
    }

    pub fn system_lock_state(&self) -> SystemLockState {
        get_system_lock_state(&self.locks)
    }

    /// Cluster-wide lock listing, quorum checked.
    pub async fn cluster_locks(
        &self,
        bucket: &str,
        prefix: &str,
        min_age: Duration,
    ) -> Result<Vec<VolumeLockInfo>> {
        let peers = self.registry.snapshot();
        list_peer_locks_info(&peers, bucket, prefix, min_age).await
    }

    /// Broadcast a service command to the cluster, this node last.
    pub async fn send_service_cmd(&self, signal: ServiceSignal) -> Vec<Result<()>> {
        let peers = self.registry.snapshot();
        send_service_cmd(&peers, signal).await
    }

    /// Serve until a stop signal arrives, restarting on restart signals.
    pub async fn serve(&self) -> Result<()> {
        loop {
            match self.serve_once().await? {
                ServiceSignal::Stop => {
                    tracing::info!("Stopping admin node {}", self.config.node_id);
                    return Ok(());
                }
                ServiceSignal::Restart => {
                    tracing::info!("Restarting admin node {}", self.config.node_id);
                    self.reload_peers()?;
                }
            }
        }
    }

    async fn next_signal(&self) -> ServiceSignal {
        // `self.local` keeps a sender alive, so the channel never closes
        // while the node exists.
        self.signal_rx
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(ServiceSignal::Stop)
    }

    async fn serve_once(&self) -> Result<ServiceSignal> {
        tracing::info!("Starting admin node: {}", self.config.node_id);
        tracing::info!("  Address: {}", self.config.address);
        tracing::info!("  Admin RPC: {}", self.config.bind_addr);
        tracing::info!("  Peers: {}", self.registry.snapshot().len());

        let router = create_router(AdminRpcState {
            credential: Arc::new(self.credential.clone()),
            local: Arc::clone(&self.local),
        });
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| Error::Internal(format!("bind {}: {}", self.config.bind_addr, e)))?;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        tracing::info!("✓ Admin node ready");
        let signal = tokio::select! {
            signal = self.next_signal() => signal,
            _ = tokio::signal::ctrl_c() => ServiceSignal::Stop,
            res = &mut server => {
                return match res {
                    Ok(Ok(())) => Ok(ServiceSignal::Stop),
                    Ok(Err(e)) => Err(Error::Internal(format!("admin RPC server error: {}", e))),
                    Err(e) => Err(Error::Internal(format!("admin RPC server task: {}", e))),
                };
            }
        };
        tracing::info!("Received service signal: {}", signal);

        let _ = stop_tx.send(());
        match server.await {
            Ok(Ok(())) => Ok(signal),
            Ok(Err(e)) => Err(Error::Internal(format!("admin RPC server error: {}", e))),
            Err(e) => Err(Error::Internal(format!("admin RPC server task: {}", e))),
        }
    }
}

fn build_peers(
    config: &Config,
    credential: &Credential,
    local: Arc<dyn CommandRunner>,
) -> Result<AdminPeers> {
    let endpoints = parse_endpoints(&config.endpoints)?;
    make_admin_peers(
        &config.address,
        local,
        &endpoints,
        &RemotePeerConfig {
            credential: credential.clone(),
            secure: config.secure,
            rpc_timeout: config.rpc_timeout(),
        },
    )
}
