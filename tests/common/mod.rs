//! Shared helpers: real admin RPC servers on loopback ports.

#![allow(dead_code)]

use minikv_admin::admin::rpc_server::{create_router, AdminRpcState};
use minikv_admin::admin::service::ServiceSignalReceiver;
use minikv_admin::admin::{
    make_admin_peers, service_signal_channel, AdminPeers, CommandRunner, LocalAdminClient,
    RemotePeerConfig,
};
use minikv_admin::common::Credential;
use minikv_admin::lock::{LockType, NamespaceParam, NsLockMap};
use reqwest::Url;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub fn credential() -> Credential {
    Credential::new("admin", "supersecret")
}

/// One node's local half: its lock table and signal receiver.
pub struct TestNode {
    pub locks: Arc<NsLockMap>,
    pub signals: ServiceSignalReceiver,
    pub runner: Arc<dyn CommandRunner>,
}

impl TestNode {
    pub fn new() -> Self {
        let (tx, rx) = service_signal_channel(4);
        let locks = Arc::new(NsLockMap::new());
        let runner: Arc<dyn CommandRunner> =
            Arc::new(LocalAdminClient::new(tx, Arc::clone(&locks)));
        Self {
            locks,
            signals: rx,
            runner,
        }
    }

    pub fn hold(&self, bucket: &str, path: &str, ops_id: &str) {
        self.locks.lock_blocked(
            NamespaceParam::new(bucket, path),
            ops_id,
            "PutObject",
            LockType::Write,
        );
    }
}

/// Serve `node` over admin RPC; returns the bound address.
pub async fn spawn_rpc_server(node: &TestNode, credential: Credential) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(AdminRpcState {
        credential: Arc::new(credential),
        local: Arc::clone(&node.runner),
    });
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn endpoint(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{}/data", addr)).unwrap()
}

/// Registry with `local` first and one remote peer per address.
pub fn registry(local: &TestNode, remotes: &[SocketAddr]) -> AdminPeers {
    let endpoints: Vec<Url> = remotes.iter().copied().map(endpoint).collect();
    make_admin_peers(
        "local-node:9000",
        Arc::clone(&local.runner),
        &endpoints,
        &RemotePeerConfig {
            credential: credential(),
            secure: false,
            rpc_timeout: Duration::from_secs(5),
        },
    )
    .unwrap()
}
