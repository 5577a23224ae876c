//! Foundation types for the Audit Evidence Ledger (AEL).
//!
//! This crate provides the entry, hash, and time types shared by every other
//! AEL crate.
//!
//! # Key Types
//!
//! - [`AuditEvent`] -- Caller-supplied payload for an append
//! - [`EntryRecord`] -- All persisted fields of an entry, including its hashes
//! - [`LedgerEntry`] -- A persisted entry with its store-assigned [`EntryId`]
//! - [`DetailValue`] -- Tagged union for the free-form `details` payload
//! - [`ChainHash`] -- Hex chain link, or the [`GENESIS`] sentinel
//! - [`Timestamp`] -- Millisecond-precision UTC time with one textual form

pub mod detail;
pub mod entry;
pub mod error;
pub mod hash;
pub mod id;
pub mod timestamp;

pub use detail::DetailValue;
pub use entry::{AuditEvent, EntryRecord, LedgerEntry, SYSTEM_ACTOR, UNKNOWN_ACTOR};
pub use error::TypeError;
pub use hash::{ChainHash, GENESIS};
pub use id::EntryId;
pub use timestamp::Timestamp;
