use std::sync::{Mutex, MutexGuard, PoisonError};

use ael_store::LedgerStore;
use ael_types::{AuditEvent, ChainHash, DetailValue, EntryRecord, LedgerEntry};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::projection::compute_entry_hash;
use crate::verifier::{ChainVerifier, VerificationReport};

/// Action recorded by the genesis entry written after a reset.
pub const RESET_ACTION: &str = "LEDGER_RESET";

/// Authorization details for a full-ledger reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetRequest {
    /// Who is resetting the ledger.
    pub actor_id: String,
    /// Why; recorded on the new genesis entry.
    pub reason: String,
}

/// A tamper-evident audit ledger over a single store.
///
/// `Ledger` is the only writer of its store. Concurrent `append` calls are
/// serialized by an internal mutex around the read-last, stamp, hash and
/// persist sequence, so no two entries can ever link to the same previous
/// hash. The store's writer section is held for the same span, which
/// extends the exclusion to other processes sharing a ledger file. The
/// previous hash is always re-read from the store inside that critical
/// section and never cached in memory.
///
/// Construct one per store at startup and share it (e.g. behind an `Arc`).
pub struct Ledger<S> {
    store: S,
    config: LedgerConfig,
    clock: Box<dyn Clock>,
    write_lock: Mutex<()>,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            clock: Box::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Append an event as a new chained entry.
    ///
    /// Validation happens before the critical section is entered. On any
    /// error the ledger is left exactly as it was.
    pub fn append(&self, event: AuditEvent) -> Result<LedgerEntry, LedgerError> {
        self.validate(&event)?;
        let _guard = self.lock_writer();
        let _section = self.store.begin_write()?;
        self.append_locked(event)
    }

    /// Verify the whole chain. Takes no write lock.
    pub fn verify(&self) -> Result<VerificationReport, LedgerError> {
        ChainVerifier::verify(&self.store)
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.store.read_all()?)
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.store.read_recent(limit)?)
    }

    /// The most recent entry.
    pub fn head(&self) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.store.last()?)
    }

    pub fn len(&self) -> Result<u64, LedgerError> {
        Ok(self.store.count()?)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    /// Purge the ledger and start a new chain whose genesis entry records
    /// the reset.
    ///
    /// Refused unless `allow_reset` is enabled in the configuration. Runs
    /// inside the append critical section.
    pub fn reset(&self, request: ResetRequest) -> Result<LedgerEntry, LedgerError> {
        if !self.config.allow_reset {
            return Err(LedgerError::ResetDisabled);
        }
        if request.actor_id.trim().is_empty() {
            return Err(LedgerError::Validation("reset requires an actor".into()));
        }
        if request.reason.trim().is_empty() {
            return Err(LedgerError::Validation("reset requires a reason".into()));
        }

        let event = AuditEvent::new(RESET_ACTION)
            .actor(request.actor_id)
            .reason(request.reason)
            .outcome("SUCCESS");
        self.validate(&event)?;

        let _guard = self.lock_writer();
        let _section = self.store.begin_write()?;
        let previous_head = self
            .store
            .last()?
            .map(|entry| entry.hash().clone())
            .unwrap_or_else(ChainHash::genesis);
        let purged = self.store.purge()?;
        warn!(
            purged,
            previous_head = %previous_head,
            actor = event.actor_or_unknown(),
            "audit ledger reset"
        );

        let event = event.details(DetailValue::map([
            ("purgedEntries", DetailValue::from(purged)),
            ("previousHead", DetailValue::from(previous_head.to_string())),
        ]));
        self.append_locked(event)
    }

    fn append_locked(&self, event: AuditEvent) -> Result<LedgerEntry, LedgerError> {
        let last = self.store.last()?;
        let (previous_hash, floor) = match &last {
            Some(entry) => (entry.hash().clone(), Some(entry.timestamp())),
            None => (ChainHash::genesis(), None),
        };

        // Never stamp earlier than the current head, so timestamp order
        // matches insertion order even if the wall clock steps back.
        let now = self.clock.now();
        let timestamp = floor.map_or(now, |floor| now.max(floor));

        let mut record = EntryRecord::stamp(event, timestamp, previous_hash);
        record.hash = compute_entry_hash(&record)?;

        let entry = self.store.insert(record)?;
        debug!(
            id = %entry.id,
            action = entry.action(),
            hash = entry.hash().short_hex(),
            prev = entry.previous_hash().short_hex(),
            "ledger append"
        );
        Ok(entry)
    }

    fn validate(&self, event: &AuditEvent) -> Result<(), LedgerError> {
        if event.action.trim().is_empty() {
            return Err(LedgerError::Validation("action is required".into()));
        }
        if event.actor_id.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(LedgerError::Validation("actorId must not be blank".into()));
        }

        let max = self.config.max_field_len;
        let fields = [
            ("actorId", event.actor_id.as_deref()),
            ("action", Some(event.action.as_str())),
            ("resource", event.resource.as_deref()),
            ("httpMethod", event.http_method.as_deref()),
            ("outcome", event.outcome.as_deref()),
            ("reason", event.reason.as_deref()),
            ("targetActorId", event.target_actor_id.as_deref()),
            ("ipAddress", event.ip_address.as_deref()),
            ("userAgent", event.user_agent.as_deref()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                if value.len() > max {
                    return Err(LedgerError::Validation(format!(
                        "{name} is {} bytes, limit is {max}",
                        value.len()
                    )));
                }
            }
        }
        Ok(())
    }

    // The mutex guards no data, so a panic in another writer cannot leave
    // anything inconsistent behind it.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}
