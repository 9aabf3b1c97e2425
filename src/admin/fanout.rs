//! Cluster fan-out: one task per remote peer, a barrier, then the local
//! peer on the calling task.
//!
//! Results are position-aligned with the peer list whatever order the
//! remote calls complete in. Nothing is cancelled early: every remote task
//! runs to completion or failure.

use crate::admin::peers::AdminPeer;
use crate::admin::runner::CommandRunner;
use crate::common::{Error, Result};
use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;

/// Run `op` against every peer. `peers[0]` is the local peer and runs
/// last, after all remote peers have finished.
pub async fn fan_out<T, F, Fut>(peers: &[AdminPeer], op: F) -> Vec<Result<T>>
where
    F: Fn(Arc<dyn CommandRunner>) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let Some((local, remotes)) = peers.split_first() else {
        return Vec::new();
    };

    let handles: Vec<_> = remotes
        .iter()
        .map(|peer| tokio::spawn(op(Arc::clone(&peer.runner))))
        .collect();
    let remote_results = join_all(handles).await;

    let mut results = Vec::with_capacity(peers.len());
    results.push(op(Arc::clone(&local.runner)).await);
    for (peer, joined) in remotes.iter().zip(remote_results) {
        results.push(joined.unwrap_or_else(|e| {
            Err(Error::Internal(format!("task for peer {} failed: {}", peer.addr, e)))
        }));
    }
    results
}
