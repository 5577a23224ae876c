//! Tamper-evident audit ledger for the Audit Evidence Ledger (AEL).
//!
//! This crate is the heart of AEL. It provides:
//! - `Ledger`, the single serialized writer that chains every appended entry
//! - The hashed field projection shared by the write and verify paths
//! - `ChainVerifier`, a full-history replay that reports every violation
//! - `LedgerWriter` / `LedgerReader` trait boundaries for collaborators
//! - `LedgerConfig`, loaded from TOML

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod projection;
pub mod traits;
pub mod verifier;

pub use clock::{Clock, SystemClock};
pub use config::{LedgerConfig, StoreConfig, DEFAULT_LEDGER_PATH};
pub use error::LedgerError;
pub use ledger::{Ledger, ResetRequest, RESET_ACTION};
pub use projection::{canonical_projection, compute_entry_hash, hashed_projection, HASHED_FIELDS};
pub use traits::{LedgerReader, LedgerWriter};
pub use verifier::{ChainVerifier, VerificationReport, Violation, ViolationKind};
