use crate::common::{PageId, Permissions, Result, TransactionId};

/// Page-level locking consulted by the buffer pool.
///
/// Every method has a permissive default: locks are always granted, never
/// held, and releasing is a no-op. An implementation that enforces real
/// locking can be handed to `BufferPool::with_lock_manager` without changing
/// any buffer pool call site. Conflicts are reported as
/// `QuarryError::TransactionAborted`.
pub trait LockManager: Send + Sync {
    /// Called before a page is handed to `tid`.
    fn acquire(&self, _tid: TransactionId, _pid: PageId, _perm: Permissions) -> Result<()> {
        Ok(())
    }

    fn release(&self, _tid: TransactionId, _pid: PageId) {}

    fn holds_lock(&self, _tid: TransactionId, _pid: PageId) -> bool {
        false
    }

    /// Drops every lock `tid` holds.
    fn release_all(&self, _tid: TransactionId) {}
}

/// The default lock manager: grants everything and tracks nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLockManager;

impl LockManager for NoopLockManager {}
