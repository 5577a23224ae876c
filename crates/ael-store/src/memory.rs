use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ael_types::{EntryId, EntryRecord, LedgerEntry};

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// In-memory, `Vec`-backed ledger store.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock`, so
/// readers only ever observe whole entries.
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<LedgerEntry>>,
    read_only: AtomicBool,
}

impl InMemoryLedgerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// Reject (or accept again) every subsequent write.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Rewrite a stored entry in place, bypassing the chain entirely.
    ///
    /// Exists for integrity drills and verifier tests: it simulates someone
    /// editing the backing table directly. Returns `false` if `index` is out
    /// of range.
    pub fn rewrite_at(&self, index: usize, edit: impl FnOnce(&mut EntryRecord)) -> bool {
        let Ok(mut entries) = self.write() else {
            return false;
        };
        match entries.get_mut(index) {
            Some(entry) => {
                edit(&mut entry.record);
                true
            }
            None => false,
        }
    }

    /// Remove a stored entry, bypassing the chain. See [`Self::rewrite_at`].
    pub fn remove_at(&self, index: usize) -> Option<LedgerEntry> {
        let mut entries = self.write().ok()?;
        (index < entries.len()).then(|| entries.remove(index))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<LedgerEntry>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::Unavailable("ledger store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<LedgerEntry>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("ledger store lock poisoned".into()))
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert(&self, record: EntryRecord) -> StoreResult<LedgerEntry> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        let entry = LedgerEntry::new(EntryId::new(), record);
        self.write()?.push(entry.clone());
        Ok(entry)
    }

    fn last(&self) -> StoreResult<Option<LedgerEntry>> {
        Ok(self.read()?.last().cloned())
    }

    fn read_all(&self) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self.read()?.clone())
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.read()?.len() as u64)
    }

    fn purge(&self) -> StoreResult<u64> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        let mut entries = self.write()?;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("entry_count", &self.count().ok())
            .field("read_only", &self.read_only.load(Ordering::SeqCst))
            .finish()
    }
}
