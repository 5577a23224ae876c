use ael_store::LedgerStore;
use ael_types::{ChainHash, EntryId, LedgerEntry};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::LedgerError;
use crate::projection::compute_entry_hash;

/// Result of a full chain verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// `true` when no violations were found.
    pub valid: bool,
    /// Number of entries scanned.
    pub count: u64,
    pub violations: Vec<Violation>,
}

impl VerificationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Violations of one kind, in ledger order.
    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

/// A specific integrity violation detected during verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Zero-based position of the entry in insertion order.
    pub index: u64,
    pub entry_id: EntryId,
    pub kind: ViolationKind,
    pub expected: String,
    pub found: String,
    /// Human-readable description including expected and found values.
    pub detail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    /// `previousHash` does not match the stored hash of the entry before it.
    BrokenLink,
    /// The stored hash does not match the entry's recomputed hash.
    ContentTampered,
}

/// Full-history chain auditor.
///
/// Replays the ledger from genesis, recomputing every hash with the same
/// projection the appender used. The chain is followed through the *stored*
/// hashes, so a single edited entry is reported once instead of breaking
/// every link after it.
pub struct ChainVerifier;

impl ChainVerifier {
    /// Read every entry from `store` and verify the chain.
    ///
    /// Only fails if the store cannot be read; integrity problems are
    /// returned as violations in the report.
    pub fn verify<S: LedgerStore + ?Sized>(store: &S) -> Result<VerificationReport, LedgerError> {
        let entries = store.read_all()?;
        Ok(Self::verify_entries(&entries))
    }

    /// Verify an already-loaded sequence of entries, oldest first.
    pub fn verify_entries(entries: &[LedgerEntry]) -> VerificationReport {
        let mut violations = Vec::new();
        let mut expected_prev = ChainHash::genesis();

        for (index, entry) in entries.iter().enumerate() {
            let index = index as u64;

            if *entry.previous_hash() != expected_prev {
                violations.push(Violation {
                    index,
                    entry_id: entry.id,
                    kind: ViolationKind::BrokenLink,
                    expected: expected_prev.to_string(),
                    found: entry.previous_hash().to_string(),
                    detail: format!(
                        "entry {index} ({}) links to {}, expected {}",
                        entry.id,
                        entry.previous_hash(),
                        expected_prev
                    ),
                });
            }

            match compute_entry_hash(&entry.record) {
                Ok(computed) if computed == *entry.hash() => {}
                Ok(computed) => violations.push(Violation {
                    index,
                    entry_id: entry.id,
                    kind: ViolationKind::ContentTampered,
                    expected: computed.to_string(),
                    found: entry.hash().to_string(),
                    detail: format!(
                        "entry {index} ({}) stores hash {}, content hashes to {}",
                        entry.id,
                        entry.hash(),
                        computed
                    ),
                }),
                Err(e) => violations.push(Violation {
                    index,
                    entry_id: entry.id,
                    kind: ViolationKind::ContentTampered,
                    expected: "canonically encodable content".into(),
                    found: e.to_string(),
                    detail: format!(
                        "entry {index} ({}) content cannot be canonicalized: {e}",
                        entry.id
                    ),
                }),
            }

            expected_prev = entry.hash().clone();
        }

        for violation in &violations {
            warn!(
                index = violation.index,
                entry = %violation.entry_id,
                kind = ?violation.kind,
                "{}",
                violation.detail
            );
        }

        let report = VerificationReport {
            valid: violations.is_empty(),
            count: entries.len() as u64,
            violations,
        };
        info!(
            count = report.count,
            violations = report.violations.len(),
            valid = report.valid,
            "ledger verification complete"
        );
        report
    }
}
