//! Namespace lock table instrumentation
//!
//! The lock-acquisition path records every blocked, granted and released
//! lock here. All state lives behind one mutex; readers and writers take
//! the same guard for the whole of their access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifies one lockable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceParam {
    pub bucket: String,
    pub path: String,
}

impl NamespaceParam {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }
}

/// Running lock counters. `total == granted + blocked` whenever observed
/// under the table guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockCounters {
    pub total: i64,
    pub granted: i64,
    pub blocked: i64,
}

impl LockCounters {
    fn add_blocked(&mut self) {
        self.total += 1;
        self.blocked += 1;
    }

    fn blocked_to_granted(&mut self) {
        self.blocked -= 1;
        self.granted += 1;
    }

    fn remove(&mut self, status: LockStatus) {
        self.total -= 1;
        match status {
            LockStatus::Running => self.granted -= 1,
            LockStatus::Blocked | LockStatus::Ready => self.blocked -= 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    #[serde(rename = "RLock")]
    Read,
    #[serde(rename = "WLock")]
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStatus {
    Ready,
    Running,
    Blocked,
}

/// State of one operation's lock on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLockInfo {
    /// Operation that requested the lock (GetObject, PutObject...)
    pub lock_source: String,
    pub lock_type: LockType,
    pub status: LockStatus,
    /// When the lock entered its current status
    pub since: DateTime<Utc>,
}

/// Lock state of every operation on one resource.
#[derive(Debug, Clone, Default)]
pub struct DebugLockInfoPerVolumePath {
    pub counters: LockCounters,
    /// Keyed by operation ID
    pub lock_info: HashMap<String, DebugLockInfo>,
}

#[derive(Debug, Default)]
pub struct LockTable {
    pub counters: LockCounters,
    pub debug_lock_map: HashMap<NamespaceParam, DebugLockInfoPerVolumePath>,
}

/// Process-wide lock table behind its single guard.
#[derive(Debug, Default)]
pub struct NsLockMap {
    table: Mutex<LockTable>,
}

impl NsLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, LockTable> {
        // The table holds plain counters and records; a panic elsewhere
        // cannot leave it in a state worse than a stale snapshot.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with read access to the table under its guard.
    pub fn with_table<R>(&self, f: impl FnOnce(&LockTable) -> R) -> R {
        let table = self.guard();
        f(&table)
    }

    /// Record an operation waiting on a lock. Returns false if the
    /// operation is already tracked on this resource.
    pub fn lock_blocked(
        &self,
        param: NamespaceParam,
        ops_id: &str,
        lock_source: &str,
        lock_type: LockType,
    ) -> bool {
        self.lock_blocked_at(param, ops_id, lock_source, lock_type, Utc::now())
    }

    pub fn lock_blocked_at(
        &self,
        param: NamespaceParam,
        ops_id: &str,
        lock_source: &str,
        lock_type: LockType,
        since: DateTime<Utc>,
    ) -> bool {
        let mut table = self.guard();
        let entry = table.debug_lock_map.entry(param).or_default();
        if entry.lock_info.contains_key(ops_id) {
            return false;
        }
        entry.lock_info.insert(
            ops_id.to_string(),
            DebugLockInfo {
                lock_source: lock_source.to_string(),
                lock_type,
                status: LockStatus::Blocked,
                since,
            },
        );
        entry.counters.add_blocked();
        table.counters.add_blocked();
        true
    }

    /// Move a blocked operation to running. Returns false if the operation
    /// is unknown or not blocked.
    pub fn lock_granted(&self, param: &NamespaceParam, ops_id: &str) -> bool {
        self.lock_granted_at(param, ops_id, Utc::now())
    }

    pub fn lock_granted_at(
        &self,
        param: &NamespaceParam,
        ops_id: &str,
        since: DateTime<Utc>,
    ) -> bool {
        let mut table = self.guard();
        let Some(entry) = table.debug_lock_map.get_mut(param) else {
            return false;
        };
        let Some(info) = entry.lock_info.get_mut(ops_id) else {
            return false;
        };
        if info.status != LockStatus::Blocked {
            return false;
        }
        info.status = LockStatus::Running;
        info.since = since;
        entry.counters.blocked_to_granted();
        table.counters.blocked_to_granted();
        true
    }

    /// Forget an operation's lock, whatever its status. Resources with no
    /// remaining operations are dropped from the table.
    pub fn lock_released(&self, param: &NamespaceParam, ops_id: &str) -> bool {
        let mut table = self.guard();
        let Some(entry) = table.debug_lock_map.get_mut(param) else {
            return false;
        };
        let Some(info) = entry.lock_info.remove(ops_id) else {
            return false;
        };
        entry.counters.remove(info.status);
        let empty = entry.lock_info.is_empty();
        table.counters.remove(info.status);
        if empty {
            table.debug_lock_map.remove(param);
        }
        true
    }
}
