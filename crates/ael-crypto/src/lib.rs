//! Canonical encoding and chain hashing for the Audit Evidence Ledger.
//!
//! Provides the deterministic canonical JSON encoder shared by the write and
//! verify paths, and the domain-separated BLAKE3 chain hasher.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod canonical;
pub mod hasher;

pub use canonical::{CanonicalEncoder, CanonicalForm, EncodingError};
pub use hasher::HashChainer;
