use std::path::{Path, PathBuf};

use ael_store::{FileLedgerStore, SyncMode};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Default location of the ledger file.
pub const DEFAULT_LEDGER_PATH: &str = "ael-ledger.jsonl";

/// Configuration for a [`Ledger`](crate::Ledger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Where and how entries are persisted.
    pub store: StoreConfig,
    /// Maximum length in bytes of any single string field of an event.
    pub max_field_len: usize,
    /// Whether the destructive full-ledger reset may be used at all.
    pub allow_reset: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            max_field_len: 4096,
            allow_reset: false,
        }
    }
}

/// File store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub sync: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LEDGER_PATH),
            sync: SyncMode::EveryWrite,
        }
    }
}

impl LedgerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, LedgerError> {
        toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Open the file store this configuration points at.
    pub fn open_file_store(&self) -> Result<FileLedgerStore, LedgerError> {
        Ok(FileLedgerStore::open(&self.store.path, self.store.sync)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.store.path, PathBuf::from("ael-ledger.jsonl"));
        assert_eq!(c.store.sync, SyncMode::EveryWrite);
        assert_eq!(c.max_field_len, 4096);
        assert!(!c.allow_reset);
    }

    #[test]
    fn parses_partial_toml() {
        let c = LedgerConfig::from_toml_str(
            r#"
            allow_reset = true

            [store]
            path = "/var/lib/ael/audit.jsonl"
            sync = "os-default"
            "#,
        )
        .unwrap();
        assert!(c.allow_reset);
        assert_eq!(c.store.path, PathBuf::from("/var/lib/ael/audit.jsonl"));
        assert_eq!(c.store.sync, SyncMode::OsDefault);
        assert_eq!(c.max_field_len, 4096);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(LedgerConfig::from_toml_str("").unwrap(), LedgerConfig::default());
    }

    #[test]
    fn rejects_bad_toml() {
        let err = LedgerConfig::from_toml_str("max_field_len = \"lots\"").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn load_reads_file_and_opens_store() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("audit.jsonl");
        let config_path = dir.path().join("ael.toml");
        std::fs::write(
            &config_path,
            format!("[store]\npath = {:?}\n", ledger_path.display().to_string()),
        )
        .unwrap();

        let c = LedgerConfig::load(&config_path).unwrap();
        assert_eq!(c.store.path, ledger_path);
        let store = c.open_file_store().unwrap();
        assert_eq!(store.path(), ledger_path.as_path());
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = LedgerConfig::load(Path::new("/nonexistent/ael.toml")).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
