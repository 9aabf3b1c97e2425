//! Cluster-wide lock listing with read quorum

use crate::admin::fanout::fan_out;
use crate::admin::peers::AdminPeer;
use crate::admin::quorum::{read_quorum, reduce_read_quorum_errs};
use crate::admin::runner::CommandRunner;
use crate::common::{Error, Result};
use crate::lock::{NamespaceParam, VolumeLockInfo};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Gather locks held on `bucket` under `prefix` for at least `min_age`
/// from every peer.
///
/// Fails with the peers' shared error when a majority report the same one,
/// and with [`Error::InsufficientReadQuorum`] when errors occurred but no
/// majority agrees. A partial listing is never returned.
pub async fn list_peer_locks_info(
    peers: &[AdminPeer],
    bucket: &str,
    prefix: &str,
    min_age: Duration,
) -> Result<Vec<VolumeLockInfo>> {
    if peers.is_empty() {
        return Err(Error::NoPeers);
    }

    let bucket = Arc::<str>::from(bucket);
    let prefix = Arc::<str>::from(prefix);
    let results = fan_out(peers, |runner: Arc<dyn CommandRunner>| {
        let bucket = Arc::clone(&bucket);
        let prefix = Arc::clone(&prefix);
        async move { runner.list_locks(&bucket, &prefix, min_age).await }
    })
    .await;

    let mut all_locks = Vec::with_capacity(results.len());
    let mut errs = Vec::with_capacity(results.len());
    for (peer, result) in peers.iter().zip(results) {
        match result {
            Ok(locks) => {
                all_locks.push(locks);
                errs.push(None);
            }
            Err(e) => {
                tracing::warn!(peer = %peer.addr, "list locks failed: {}", e);
                all_locks.push(Vec::new());
                errs.push(Some(e));
            }
        }
    }

    reduce_read_quorum_errs(&errs, &[], read_quorum(peers.len()))?;
    Ok(merge_lock_infos(all_locks))
}

/// Flatten per-node listings, keeping entries for the same (bucket, object)
/// adjacent. Entries are neither deduplicated nor summed across nodes.
pub fn merge_lock_infos(per_node: Vec<Vec<VolumeLockInfo>>) -> Vec<VolumeLockInfo> {
    let mut order: Vec<NamespaceParam> = Vec::new();
    let mut grouped: HashMap<NamespaceParam, Vec<VolumeLockInfo>> = HashMap::new();
    for info in per_node.into_iter().flatten() {
        let param = NamespaceParam::new(info.bucket.clone(), info.object.clone());
        grouped
            .entry(param)
            .or_insert_with_key(|param| {
                order.push(param.clone());
                Vec::new()
            })
            .push(info);
    }

    order
        .into_iter()
        .filter_map(|param| grouped.remove(&param))
        .flatten()
        .collect()
}
