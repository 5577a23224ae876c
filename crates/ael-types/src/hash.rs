use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The `previous_hash` carried by the first entry of every ledger.
pub const GENESIS: &str = "0";

/// Hex-encoded link in the audit chain.
///
/// A `ChainHash` is either the genesis sentinel [`GENESIS`] or the
/// lowercase hex encoding of a 256-bit digest. Values read back from storage
/// are kept verbatim, even when malformed, so that the verifier can report
/// exactly what it found.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainHash(String);

impl ChainHash {
    /// The genesis sentinel.
    pub fn genesis() -> Self {
        Self(GENESIS.to_string())
    }

    /// Encode a raw 32-byte digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Wrap a string exactly as it was stored, without validation.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a 64-character hex digest or the genesis sentinel.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s == GENESIS {
            return Ok(Self::genesis());
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Returns `true` if this is the genesis sentinel.
    pub fn is_genesis(&self) -> bool {
        self.0 == GENESIS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_hex(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl Default for ChainHash {
    fn default() -> Self {
        Self::genesis()
    }
}

impl fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHash({})", self.short_hex())
    }
}

impl fmt::Display for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
