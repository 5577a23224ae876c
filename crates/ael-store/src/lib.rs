//! Append-only entry storage for the Audit Evidence Ledger.
//!
//! The ledger core only needs three access patterns from storage: insert an
//! entry, fetch the most recent entry, and fetch every entry in insertion
//! order. This crate defines that boundary and ships two backends.
//!
//! # Storage Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`InMemoryLedgerStore`] -- `Vec`-based store for tests and embedding
//! - [`FileLedgerStore`] -- JSON-lines file with torn-write recovery
//!
//! # Design Rules
//!
//! 1. Entries are immutable once written.
//! 2. Readers only ever see fully committed entries.
//! 3. A failed insert leaves no trace.
//! 4. The store never interprets or re-hashes entries; that is the verifier's job.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileLedgerStore, SyncMode};
pub use memory::InMemoryLedgerStore;
pub use traits::{LedgerStore, WriteLock};
