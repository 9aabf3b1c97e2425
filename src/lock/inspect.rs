//! Point-in-time views of the local lock table
//!
//! Both entry points hold the table guard for the whole traversal and
//! sample the clock once, so every duration in one snapshot is measured
//! against the same instant.

use crate::common::utils::duration_nanos;
use crate::lock::table::{
    DebugLockInfo, DebugLockInfoPerVolumePath, LockStatus, LockType, NamespaceParam, NsLockMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lock state of the whole node: total locks held, operations blocked on
/// locks, and per-object detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLockState {
    #[serde(rename = "totalLocks")]
    pub total_locks: i64,
    /// Operations waiting for a lock to be released
    #[serde(rename = "totalBlockedLocks")]
    pub total_blocked_locks: i64,
    /// Operations holding a lock that has not been released yet
    #[serde(rename = "totalAcquiredLocks")]
    pub total_acquired_locks: i64,
    #[serde(rename = "locksInfoPerObject")]
    pub locks_info_per_object: Vec<VolumeLockInfo>,
}

/// Lock state of one (bucket, object) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLockInfo {
    pub bucket: String,
    pub object: String,
    /// Blocked + running locks on this object
    #[serde(rename = "locksOnObject")]
    pub locks_on_object: i64,
    #[serde(rename = "locksAcquiredOnObject")]
    pub locks_acquired_on_object: i64,
    #[serde(rename = "locksBlockedOnObject")]
    pub total_blocked_locks: i64,
    #[serde(rename = "lockDetailsOnObject", default)]
    pub lock_details: Vec<OpsLockState>,
}

/// State of one operation's lock, with its age at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpsLockState {
    #[serde(rename = "opsID")]
    pub operation_id: String,
    #[serde(rename = "lockSource")]
    pub lock_source: String,
    #[serde(rename = "lockType")]
    pub lock_type: LockType,
    pub status: LockStatus,
    #[serde(rename = "statusSince")]
    pub since: DateTime<Utc>,
    #[serde(rename = "statusDuration", with = "duration_nanos")]
    pub duration: Duration,
}

impl OpsLockState {
    fn from_record(ops_id: &str, info: &DebugLockInfo, elapsed: Duration) -> Self {
        Self {
            operation_id: ops_id.to_string(),
            lock_source: info.lock_source.clone(),
            lock_type: info.lock_type,
            status: info.status,
            since: info.since,
            duration: elapsed,
        }
    }
}

impl VolumeLockInfo {
    fn from_entry(param: &NamespaceParam, entry: &DebugLockInfoPerVolumePath) -> Self {
        Self {
            bucket: param.bucket.clone(),
            object: param.path.clone(),
            locks_on_object: entry.counters.total,
            locks_acquired_on_object: entry.counters.granted,
            total_blocked_locks: entry.counters.blocked,
            lock_details: Vec::new(),
        }
    }
}

/// Time since `since`, clamped to zero for records stamped in the future.
fn elapsed_since(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

/// Read the entire lock state of this node.
pub fn get_system_lock_state(locks: &NsLockMap) -> SystemLockState {
    get_system_lock_state_at(locks, Utc::now())
}

pub fn get_system_lock_state_at(locks: &NsLockMap, now: DateTime<Utc>) -> SystemLockState {
    locks.with_table(|table| SystemLockState {
        total_locks: table.counters.total,
        total_blocked_locks: table.counters.blocked,
        total_acquired_locks: table.counters.granted,
        locks_info_per_object: table
            .debug_lock_map
            .iter()
            .map(|(param, entry)| {
                let mut info = VolumeLockInfo::from_entry(param, entry);
                info.lock_details = entry
                    .lock_info
                    .iter()
                    .map(|(ops_id, record)| {
                        OpsLockState::from_record(ops_id, record, elapsed_since(now, record.since))
                    })
                    .collect();
                info
            })
            .collect(),
    })
}

/// Locks held on `bucket` under `prefix` for at least `min_age`.
///
/// One entry is emitted per matching operation, each carrying its object's
/// counters and that single operation's detail. An empty prefix matches
/// every object in the bucket.
pub fn list_locks_info(
    locks: &NsLockMap,
    bucket: &str,
    prefix: &str,
    min_age: Duration,
) -> Vec<VolumeLockInfo> {
    list_locks_info_at(locks, bucket, prefix, min_age, Utc::now())
}

pub fn list_locks_info_at(
    locks: &NsLockMap,
    bucket: &str,
    prefix: &str,
    min_age: Duration,
    now: DateTime<Utc>,
) -> Vec<VolumeLockInfo> {
    locks.with_table(|table| {
        let mut volume_locks = Vec::new();
        for (param, entry) in &table.debug_lock_map {
            if param.bucket != bucket || !param.path.starts_with(prefix) {
                continue;
            }
            for (ops_id, record) in &entry.lock_info {
                let elapsed = elapsed_since(now, record.since);
                if elapsed < min_age {
                    continue;
                }
                let mut info = VolumeLockInfo::from_entry(param, entry);
                info.lock_details
                    .push(OpsLockState::from_record(ops_id, record, elapsed));
                volume_locks.push(info);
            }
        }
        volume_locks
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn seeded(now: DateTime<Utc>) -> NsLockMap {
        let map = NsLockMap::new();
        let old = now - TimeDelta::seconds(120);
        let fresh = now - TimeDelta::seconds(1);

        let cat = NamespaceParam::new("photos", "2024/cat.png");
        map.lock_blocked_at(cat.clone(), "op-1", "PutObject", LockType::Write, old);
        map.lock_granted_at(&cat, "op-1", old);
        map.lock_blocked_at(cat.clone(), "op-2", "GetObject", LockType::Read, old);
        map.lock_blocked_at(cat, "op-3", "GetObject", LockType::Read, fresh);

        let dog = NamespaceParam::new("photos", "2023/dog.png");
        map.lock_blocked_at(dog, "op-4", "DeleteObject", LockType::Write, old);

        let other = NamespaceParam::new("videos", "2024/cat.mp4");
        map.lock_blocked_at(other, "op-5", "GetObject", LockType::Read, old);
        map
    }

    fn ops_ids(infos: &[VolumeLockInfo]) -> Vec<String> {
        let mut ids: Vec<String> = infos
            .iter()
            .flat_map(|i| i.lock_details.iter().map(|d| d.operation_id.clone()))
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_system_lock_state() {
        let now = Utc::now();
        let map = seeded(now);
        let state = get_system_lock_state_at(&map, now);

        assert_eq!(state.total_locks, 5);
        assert_eq!(state.total_acquired_locks, 1);
        assert_eq!(state.total_blocked_locks, 4);
        assert_eq!(state.locks_info_per_object.len(), 3);

        let cat = state
            .locks_info_per_object
            .iter()
            .find(|i| i.object == "2024/cat.png" && i.bucket == "photos")
            .unwrap();
        assert_eq!(cat.locks_on_object, 3);
        assert_eq!(cat.locks_acquired_on_object, 1);
        assert_eq!(cat.total_blocked_locks, 2);
        assert_eq!(cat.lock_details.len(), 3);

        let op1 = cat
            .lock_details
            .iter()
            .find(|d| d.operation_id == "op-1")
            .unwrap();
        assert_eq!(op1.status, LockStatus::Running);
        assert_eq!(op1.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_system_lock_state_is_stable() {
        let now = Utc::now();
        let map = seeded(now);
        let first = get_system_lock_state_at(&map, now);
        let second = get_system_lock_state_at(&map, now);
        assert_eq!(first.total_locks, second.total_locks);
        assert_eq!(first.total_blocked_locks, second.total_blocked_locks);
        assert_eq!(first.total_acquired_locks, second.total_acquired_locks);

        let live_a = get_system_lock_state(&map);
        let live_b = get_system_lock_state(&map);
        assert_eq!(
            (live_a.total_locks, live_a.total_acquired_locks, live_a.total_blocked_locks),
            (live_b.total_locks, live_b.total_acquired_locks, live_b.total_blocked_locks)
        );
    }

    #[test]
    fn test_list_empty_prefix_matches_bucket() {
        let now = Utc::now();
        let map = seeded(now);
        let infos = list_locks_info_at(&map, "photos", "", Duration::ZERO, now);
        assert_eq!(ops_ids(&infos), vec!["op-1", "op-2", "op-3", "op-4"]);
        assert!(infos.iter().all(|i| i.bucket == "photos"));
    }

    #[test]
    fn test_list_filters_prefix_and_age() {
        let now = Utc::now();
        let map = seeded(now);
        let infos = list_locks_info_at(&map, "photos", "2024/", Duration::from_secs(60), now);
        assert_eq!(ops_ids(&infos), vec!["op-1", "op-2"]);
        assert!(infos
            .iter()
            .all(|i| i.object.starts_with("2024/") && i.lock_details[0].duration >= Duration::from_secs(60)));
    }

    #[test]
    fn test_list_emits_one_entry_per_operation() {
        let now = Utc::now();
        let map = seeded(now);
        let infos = list_locks_info_at(&map, "photos", "2024/cat", Duration::ZERO, now);
        assert_eq!(infos.len(), 3);
        for info in &infos {
            assert_eq!(info.lock_details.len(), 1);
            assert_eq!(info.locks_on_object, 3);
            assert_eq!(info.locks_acquired_on_object, 1);
            assert_eq!(info.total_blocked_locks, 2);
        }
    }

    #[test]
    fn test_list_unknown_bucket() {
        let now = Utc::now();
        let map = seeded(now);
        assert!(list_locks_info_at(&map, "missing", "", Duration::ZERO, now).is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let now = Utc::now();
        let map = seeded(now);
        let infos = list_locks_info_at(&map, "videos", "", Duration::ZERO, now);
        let json = serde_json::to_value(&infos[0]).unwrap();
        for field in [
            "bucket",
            "object",
            "locksOnObject",
            "locksAcquiredOnObject",
            "locksBlockedOnObject",
            "lockDetailsOnObject",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        let detail = &json["lockDetailsOnObject"][0];
        assert_eq!(detail["opsID"], "op-5");
        assert_eq!(detail["lockType"], "RLock");
        assert_eq!(detail["status"], "Blocked");
        assert_eq!(detail["statusDuration"], 120_000_000_000u64);

        let back: VolumeLockInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, infos[0]);
    }
}
