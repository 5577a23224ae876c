use ael_types::ChainHash;

use crate::canonical::CanonicalForm;

/// Domain-separated BLAKE3 chain hasher.
///
/// This is the single place the ledger's digest algorithm is chosen. Every
/// entry hash is `BLAKE3(domain || ":" || canonical_bytes)`, hex encoded.
/// Changing the algorithm or the domain tag changes the ledger format.
pub struct HashChainer {
    domain: &'static str,
}

impl HashChainer {
    /// Hasher for ledger entries (format version 1).
    pub const ENTRY: Self = Self {
        domain: "ael-entry-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash a canonical form.
    pub fn compute_hash(&self, canonical: &CanonicalForm) -> ChainHash {
        self.hash_bytes(canonical.as_bytes())
    }

    /// Hash raw bytes with domain separation.
    pub fn hash_bytes(&self, data: &[u8]) -> ChainHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ChainHash::from_digest(*hasher.finalize().as_bytes())
    }

    /// Check that a canonical form produces the expected hash.
    pub fn verify(&self, canonical: &CanonicalForm, expected: &ChainHash) -> bool {
        self.compute_hash(canonical) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
