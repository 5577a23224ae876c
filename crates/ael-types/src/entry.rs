use serde::{Deserialize, Serialize};

use crate::detail::DetailValue;
use crate::hash::ChainHash;
use crate::id::EntryId;
use crate::timestamp::Timestamp;

/// Actor recorded when the caller does not identify one.
pub const UNKNOWN_ACTOR: &str = "UNKNOWN";

/// Actor recorded for events emitted by the ledger itself.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// A security-relevant action as reported by a collaborator.
///
/// This is the logical payload handed to `append`. It carries no timestamp
/// and no hashes: those are stamped by the ledger inside its write critical
/// section.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub actor_id: Option<String>,
    pub action: String,
    pub resource: Option<String>,
    pub http_method: Option<String>,
    pub outcome: Option<String>,
    pub reason: Option<String>,
    pub target_actor_id: Option<String>,
    pub details: Option<DetailValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn http_method(mut self, method: impl Into<String>) -> Self {
        self.http_method = Some(method.into());
        self
    }

    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn target_actor(mut self, target: impl Into<String>) -> Self {
        self.target_actor_id = Some(target.into());
        self
    }

    pub fn details(mut self, details: impl Into<DetailValue>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// The actor to record, falling back to [`UNKNOWN_ACTOR`].
    pub fn actor_or_unknown(&self) -> &str {
        self.actor_id.as_deref().unwrap_or(UNKNOWN_ACTOR)
    }
}

/// Every persisted field of an entry except its store-assigned id.
///
/// Field order here is the persisted layout. All of these fields except
/// `hash` feed the hashed projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub actor_id: String,
    pub action: String,
    pub resource: Option<String>,
    pub http_method: Option<String>,
    pub outcome: Option<String>,
    pub reason: Option<String>,
    pub target_actor_id: Option<String>,
    pub details: Option<DetailValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: Timestamp,
    pub previous_hash: ChainHash,
    pub hash: ChainHash,
}

impl EntryRecord {
    /// Combine an event with the values stamped at write time.
    ///
    /// `hash` starts out as the genesis sentinel and must be filled in once
    /// the projection has been hashed.
    pub fn stamp(event: AuditEvent, timestamp: Timestamp, previous_hash: ChainHash) -> Self {
        let actor_id = event.actor_or_unknown().to_string();
        Self {
            actor_id,
            action: event.action,
            resource: event.resource,
            http_method: event.http_method,
            outcome: event.outcome,
            reason: event.reason,
            target_actor_id: event.target_actor_id,
            details: event.details,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            timestamp,
            previous_hash,
            hash: ChainHash::genesis(),
        }
    }
}

/// An entry as read back from the ledger store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    #[serde(flatten)]
    pub record: EntryRecord,
}

impl LedgerEntry {
    pub fn new(id: EntryId, record: EntryRecord) -> Self {
        Self { id, record }
    }

    pub fn hash(&self) -> &ChainHash {
        &self.record.hash
    }

    pub fn previous_hash(&self) -> &ChainHash {
        &self.record.previous_hash
    }

    pub fn timestamp(&self) -> Timestamp {
        self.record.timestamp
    }

    pub fn action(&self) -> &str {
        &self.record.action
    }
}
