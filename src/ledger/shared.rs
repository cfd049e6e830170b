//! Shared Ledger Handle
//!
//! Single-writer wrapper for hosts that touch one ledger from several
//! threads. Appends and locking take the write lock; verification, export
//! and queries share the read lock, so they may run alongside each other
//! but never interleave with an in-flight append.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::ledger::block::BlockRecord;
use crate::ledger::chain::{AuditLedger, NewEvent};
use crate::ledger::snapshot::LedgerSnapshot;
use crate::ledger::verify::VerificationResult;

/// Cloneable, thread-safe handle to one [`AuditLedger`]
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<AuditLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: AuditLedger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    // Poisoning is ignored; append mutates only after its last fallible step.
    fn read_guard(&self) -> RwLockReadGuard<'_, AuditLedger> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, AuditLedger> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append under the write lock, returning the new block's projection
    pub fn append(&self, event: NewEvent) -> Result<BlockRecord> {
        let mut ledger = self.write_guard();
        ledger.append(event).map(|block| block.to_record())
    }

    pub fn lock(&self) {
        self.write_guard().lock();
    }

    /// Run a read-only closure against the ledger
    pub fn read<T>(&self, f: impl FnOnce(&AuditLedger) -> T) -> T {
        f(&self.read_guard())
    }

    /// Swap in a different ledger, e.g. a freshly imported one
    pub fn replace(&self, ledger: AuditLedger) -> AuditLedger {
        std::mem::replace(&mut *self.write_guard(), ledger)
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    pub fn verify_integrity(&self) -> VerificationResult {
        self.read_guard().verify_integrity()
    }

    pub fn export(&self) -> LedgerSnapshot {
        self.read_guard().export()
    }
}
