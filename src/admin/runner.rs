//! Local and remote execution of admin commands

use crate::admin::rpc_client::{
    AuthRpcArgs, AuthRpcClient, AuthRpcReply, ListLocksQuery, ListLocksReply,
};
use crate::admin::service::{ServiceSignal, ServiceSignalSender};
use crate::common::Result;
use crate::lock::{list_locks_info, NsLockMap, VolumeLockInfo};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const METHOD_SHUTDOWN: &str = "Admin.Shutdown";
pub const METHOD_RESTART: &str = "Admin.Restart";
pub const METHOD_LIST_LOCKS: &str = "Admin.ListLocks";

/// Admin commands a node can run, either on itself or on a peer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn stop(&self) -> Result<()>;

    async fn restart(&self) -> Result<()>;

    /// Locks held on `bucket` under `prefix` for at least `min_age`.
    async fn list_locks(
        &self,
        bucket: &str,
        prefix: &str,
        min_age: Duration,
    ) -> Result<Vec<VolumeLockInfo>>;
}

/// Runs commands on this node: lifecycle commands go to the service
/// signal channel, lock queries read the local lock table.
#[derive(Debug, Clone)]
pub struct LocalAdminClient {
    signals: ServiceSignalSender,
    locks: Arc<NsLockMap>,
}

impl LocalAdminClient {
    pub fn new(signals: ServiceSignalSender, locks: Arc<NsLockMap>) -> Self {
        Self { signals, locks }
    }
}

#[async_trait]
impl CommandRunner for LocalAdminClient {
    async fn stop(&self) -> Result<()> {
        self.signals.post(ServiceSignal::Stop)
    }

    async fn restart(&self) -> Result<()> {
        self.signals.post(ServiceSignal::Restart)
    }

    async fn list_locks(
        &self,
        bucket: &str,
        prefix: &str,
        min_age: Duration,
    ) -> Result<Vec<VolumeLockInfo>> {
        Ok(list_locks_info(&self.locks, bucket, prefix, min_age))
    }
}

/// Runs commands on a peer over authenticated RPC. Errors from the call
/// are returned as-is.
#[derive(Debug, Clone)]
pub struct RemoteAdminClient {
    client: AuthRpcClient,
}

impl RemoteAdminClient {
    pub fn new(client: AuthRpcClient) -> Self {
        Self { client }
    }

    pub fn server_addr(&self) -> &str {
        self.client.server_addr()
    }
}

#[async_trait]
impl CommandRunner for RemoteAdminClient {
    async fn stop(&self) -> Result<()> {
        let _: AuthRpcReply = self.client.call(METHOD_SHUTDOWN, &AuthRpcArgs {}).await?;
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        let _: AuthRpcReply = self.client.call(METHOD_RESTART, &AuthRpcArgs {}).await?;
        Ok(())
    }

    async fn list_locks(
        &self,
        bucket: &str,
        prefix: &str,
        min_age: Duration,
    ) -> Result<Vec<VolumeLockInfo>> {
        let query = ListLocksQuery {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            min_age,
        };
        let reply: ListLocksReply = self.client.call(METHOD_LIST_LOCKS, &query).await?;
        Ok(reply.volume_locks)
    }
}
