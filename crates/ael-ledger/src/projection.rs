//! The hashed projection of a ledger entry.
//!
//! This module is the wire contract of the ledger: it decides exactly which
//! fields are hashed and under which names. The appender and the verifier
//! both go through [`compute_entry_hash`], so the two can never disagree on
//! the projection.

use ael_crypto::{CanonicalEncoder, CanonicalForm, EncodingError, HashChainer};
use ael_types::{ChainHash, DetailValue, EntryRecord};

/// Names of the hashed fields, in persisted-layout order.
///
/// Every key is always present in the projection; absent optional values
/// are hashed as `null`. The store-assigned id and the hash itself are not
/// part of the projection.
pub const HASHED_FIELDS: [&str; 12] = [
    "actorId",
    "action",
    "resource",
    "httpMethod",
    "outcome",
    "reason",
    "targetActorId",
    "details",
    "ipAddress",
    "userAgent",
    "timestamp",
    "previousHash",
];

/// Build the structured value that gets canonicalized and hashed.
pub fn hashed_projection(record: &EntryRecord) -> DetailValue {
    let values = [
        DetailValue::from(record.actor_id.as_str()),
        DetailValue::from(record.action.as_str()),
        optional(&record.resource),
        optional(&record.http_method),
        optional(&record.outcome),
        optional(&record.reason),
        optional(&record.target_actor_id),
        record.details.clone().unwrap_or(DetailValue::Null),
        optional(&record.ip_address),
        optional(&record.user_agent),
        DetailValue::Timestamp(record.timestamp),
        DetailValue::from(record.previous_hash.as_str()),
    ];
    DetailValue::map(HASHED_FIELDS.into_iter().zip(values))
}

/// Canonical bytes of the hashed projection.
pub fn canonical_projection(record: &EntryRecord) -> Result<CanonicalForm, EncodingError> {
    CanonicalEncoder::canonicalize(&hashed_projection(record))
}

/// The hash an entry with this content must carry.
pub fn compute_entry_hash(record: &EntryRecord) -> Result<ChainHash, EncodingError> {
    Ok(HashChainer::ENTRY.compute_hash(&canonical_projection(record)?))
}

fn optional(value: &Option<String>) -> DetailValue {
    value.as_deref().map_or(DetailValue::Null, DetailValue::from)
}
