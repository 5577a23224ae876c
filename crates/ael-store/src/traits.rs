use ael_types::{EntryRecord, LedgerEntry};

use crate::error::StoreResult;

/// Append-only persistence for ledger entries.
///
/// All implementations must satisfy these invariants:
/// - `insert` is atomic: on error no part of the entry is visible, and on
///   success the entry is the new last entry.
/// - Reads only ever return fully committed entries, in insertion order.
/// - Entries are never rewritten through this trait; `purge` is the only
///   destructive operation and is reserved for authorized resets.
/// - All I/O errors are propagated, never silently ignored.
pub trait LedgerStore: Send + Sync {
    /// Persist a fully hashed record and return it with its assigned id.
    fn insert(&self, record: EntryRecord) -> StoreResult<LedgerEntry>;

    /// The most recently inserted entry, or `None` for an empty store.
    fn last(&self) -> StoreResult<Option<LedgerEntry>>;

    /// Every committed entry, oldest first.
    fn read_all(&self) -> StoreResult<Vec<LedgerEntry>>;

    /// Number of committed entries.
    fn count(&self) -> StoreResult<u64> {
        Ok(self.read_all()?.len() as u64)
    }

    /// The newest `limit` entries, oldest first.
    fn read_recent(&self, limit: usize) -> StoreResult<Vec<LedgerEntry>> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    /// Remove every entry. Returns how many were removed.
    fn purge(&self) -> StoreResult<u64>;

    /// Enter the store's exclusive writer section, left when the returned
    /// lock is dropped.
    ///
    /// The ledger holds it across read-last, hash and insert. Stores that
    /// can be shared between processes exclude every other writer here; the
    /// default takes no lock and relies on the caller serializing writes.
    fn begin_write(&self) -> StoreResult<WriteLock<'_>> {
        Ok(WriteLock::unlocked())
    }
}

trait Held {}
impl<T> Held for T {}

/// Guard for a store's writer section. See [`LedgerStore::begin_write`].
#[must_use = "the writer section ends when the lock is dropped"]
pub struct WriteLock<'a> {
    _held: Option<Box<dyn Held + 'a>>,
}

impl<'a> WriteLock<'a> {
    /// A section that holds nothing.
    pub fn unlocked() -> Self {
        Self { _held: None }
    }

    /// A section that lasts as long as `guard` is alive.
    pub fn holding<G: 'a>(guard: G) -> Self {
        Self {
            _held: Some(Box::new(guard)),
        }
    }
}

impl std::fmt::Debug for WriteLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteLock")
            .field("held", &self._held.is_some())
            .finish()
    }
}
