//! Namespace lock table and its local inspection

pub mod inspect;
pub mod table;

pub use inspect::{
    get_system_lock_state, list_locks_info, OpsLockState, SystemLockState, VolumeLockInfo,
};
pub use table::{LockCounters, LockStatus, LockType, NamespaceParam, NsLockMap};
