use ael_store::LedgerStore;
use ael_types::{AuditEvent, LedgerEntry};

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::verifier::VerificationReport;

/// Write boundary handed to collaborators that record audit events.
pub trait LedgerWriter: Send + Sync {
    fn append(&self, event: AuditEvent) -> Result<LedgerEntry, LedgerError>;
}

/// Read boundary for reporting and integrity checks.
pub trait LedgerReader: Send + Sync {
    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    fn head(&self) -> Result<Option<LedgerEntry>, LedgerError>;

    fn verify(&self) -> Result<VerificationReport, LedgerError>;
}

impl<S: LedgerStore> LedgerWriter for Ledger<S> {
    fn append(&self, event: AuditEvent) -> Result<LedgerEntry, LedgerError> {
        Ledger::append(self, event)
    }
}

impl<S: LedgerStore> LedgerReader for Ledger<S> {
    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ledger::entries(self)
    }

    fn head(&self) -> Result<Option<LedgerEntry>, LedgerError> {
        Ledger::head(self)
    }

    fn verify(&self) -> Result<VerificationReport, LedgerError> {
        Ledger::verify(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ael_store::InMemoryLedgerStore;

    use super::*;

    /// A collaborator that only sees the trait objects.
    struct LoginHandler {
        audit: Arc<dyn LedgerWriter>,
    }

    impl LoginHandler {
        fn failed_login(&self, user: &str) -> Result<LedgerEntry, LedgerError> {
            self.audit.append(
                AuditEvent::new("LOGIN_FAILURE")
                    .actor(user)
                    .outcome("FAILURE")
                    .reason("invalid credentials"),
            )
        }
    }

    #[test]
    fn collaborators_write_and_audit_through_traits() {
        let ledger = Arc::new(Ledger::new(InMemoryLedgerStore::new()));
        let handler = LoginHandler {
            audit: ledger.clone(),
        };
        handler.failed_login("mallory").unwrap();
        handler.failed_login("mallory").unwrap();

        let reader: Arc<dyn LedgerReader> = ledger;
        assert_eq!(reader.entries().unwrap().len(), 2);
        assert_eq!(reader.head().unwrap().unwrap().action(), "LOGIN_FAILURE");
        assert!(reader.verify().unwrap().valid);
    }
}
