//! Ledger Block
//!
//! A single immutable, hash-linked record of one audit event.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};
use crate::ledger::event::{EventSeverity, EventType};

/// Structured event payload
pub type Payload = serde_json::Map<String, Value>;

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Session identifier reserved for the genesis block
pub const SYSTEM_SESSION_ID: &str = "SYSTEM";

/// Inputs for constructing a [`Block`]
#[derive(Debug, Clone)]
pub struct BlockParams {
    pub index: usize,
    pub transaction_id: String,
    pub session_id: String,
    pub event_type: EventType,
    pub event_summary: Option<String>,
    pub payload: Payload,
    pub timestamp: Option<DateTime<Utc>>,
    pub previous_hash: String,
}

/// Immutable ledger block.
///
/// Fields are private and there are no setters; structured accessors
/// (`payload`, `timestamp`) hand out owned copies. The hash is computed once
/// in [`Block::new`] and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    index: usize,
    transaction_id: String,
    session_id: String,
    event_type: EventType,
    event_summary: String,
    payload: Payload,
    timestamp: DateTime<Utc>,
    previous_hash: String,
    hash: String,
}

impl Block {
    /// Validate inputs, resolve the summary and seal the block with its hash
    pub fn new(params: BlockParams) -> Result<Self> {
        if params.transaction_id.is_empty() {
            return Err(LedgerError::missing_field("Transaction ID"));
        }
        if params.session_id.is_empty() {
            return Err(LedgerError::missing_field("Session ID"));
        }
        if params.event_type.is_empty() {
            return Err(LedgerError::missing_field("Event type"));
        }
        if params.previous_hash.is_empty() {
            return Err(LedgerError::ValidationError(
                "Previous hash is required (use \"0\" for genesis block)".to_string(),
            ));
        }

        let event_summary = match params.event_summary {
            Some(summary) if !summary.is_empty() => summary,
            _ => params.event_type.default_summary(&params.payload),
        };
        let timestamp = truncate_to_millis(params.timestamp.unwrap_or_else(Utc::now));

        let mut block = Self {
            index: params.index,
            transaction_id: params.transaction_id,
            session_id: params.session_id,
            event_type: params.event_type,
            event_summary,
            payload: params.payload,
            timestamp,
            previous_hash: params.previous_hash,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        Ok(block)
    }

    /// The genesis block: index 0, session `SYSTEM`, previous hash `"0"`
    pub fn genesis(transaction_id: String, payload: Payload) -> Self {
        let event_type = EventType::Genesis;
        let mut block = Self {
            index: 0,
            transaction_id,
            session_id: SYSTEM_SESSION_ID.to_string(),
            event_summary: event_type.default_summary(&payload),
            event_type,
            payload,
            timestamp: truncate_to_millis(Utc::now()),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Rebuild a block from its projection, refusing it if the recomputed
    /// hash differs from the one it carries
    pub fn from_record(record: &BlockRecord) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&record.timestamp)
            .map_err(|e| {
                LedgerError::ValidationError(format!(
                    "Invalid timestamp '{}' in block {}: {}",
                    record.timestamp, record.index, e
                ))
            })?
            .with_timezone(&Utc);

        let block = Self::new(BlockParams {
            index: record.index,
            transaction_id: record.transaction_id.clone(),
            session_id: record.session_id.clone(),
            event_type: record.event_type.clone(),
            event_summary: Some(record.event_summary.clone()),
            payload: record.payload.clone(),
            timestamp: Some(timestamp),
            previous_hash: record.previous_hash.clone(),
        })?;

        if block.hash != record.hash {
            return Err(LedgerError::HashMismatch {
                index: record.index,
                expected: record.hash.clone(),
                actual: block.hash,
            });
        }

        Ok(block)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn event_summary(&self) -> &str {
        &self.event_summary
    }

    /// Copy of the payload; the stored payload is never handed out
    pub fn payload(&self) -> Payload {
        self.payload.clone()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// ISO-8601 timestamp with millisecond precision, as hashed
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Canonical JSON over every field except the hash itself.
    ///
    /// Object keys are emitted in sorted order, payload keys included.
    pub fn canonical_string(&self) -> String {
        let mut canonical = Payload::new();
        canonical.insert("index".to_string(), Value::from(self.index));
        canonical.insert(
            "transactionId".to_string(),
            Value::from(self.transaction_id.as_str()),
        );
        canonical.insert("sessionId".to_string(), Value::from(self.session_id.as_str()));
        canonical.insert("eventType".to_string(), Value::from(self.event_type.as_str()));
        canonical.insert(
            "eventSummary".to_string(),
            Value::from(self.event_summary.as_str()),
        );
        canonical.insert("payload".to_string(), Value::Object(self.payload.clone()));
        canonical.insert("timestamp".to_string(), Value::from(self.timestamp_iso()));
        canonical.insert(
            "previousHash".to_string(),
            Value::from(self.previous_hash.as_str()),
        );
        Value::Object(canonical).to_string()
    }

    /// Hex-encoded SHA-256 of the canonical string
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the stored hash still matches the block's content
    pub fn validate_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Check linkage and index contiguity against the predecessor.
    ///
    /// Without a predecessor the block must look like genesis. Neither
    /// block's own hash is checked here.
    pub fn validate_chain_link(&self, previous: Option<&Block>) -> bool {
        match previous {
            None => self.is_genesis(),
            Some(previous) => {
                self.previous_hash == previous.hash && self.index == previous.index + 1
            }
        }
    }

    pub fn severity(&self) -> EventSeverity {
        self.event_type.severity()
    }

    /// Transport projection with derived `severity` and `hashValid`
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            index: self.index,
            transaction_id: self.transaction_id.clone(),
            session_id: self.session_id.clone(),
            event_type: self.event_type.clone(),
            event_summary: self.event_summary.clone(),
            payload: self.payload.clone(),
            timestamp: self.timestamp_iso(),
            previous_hash: self.previous_hash.clone(),
            hash: self.hash.clone(),
            severity: self.severity(),
            hash_valid: self.validate_hash(),
        }
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Plain projection of a [`Block`] for transport and snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub index: usize,
    pub transaction_id: String,
    pub session_id: String,
    pub event_type: EventType,
    #[serde(default)]
    pub event_summary: String,
    #[serde(default)]
    pub payload: Payload,
    pub timestamp: String,
    pub previous_hash: String,
    pub hash: String,
    #[serde(default)]
    pub severity: EventSeverity,
    #[serde(default)]
    pub hash_valid: bool,
}

fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let millis_only = timestamp.nanosecond() / 1_000_000 * 1_000_000;
    timestamp.with_nanosecond(millis_only).unwrap_or(timestamp)
}

#[cfg(test)]
impl Block {
    /// Overwrite the payload in place, leaving the sealed hash untouched
    pub(crate) fn tamper_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Overwrite the payload and re-seal the hash to match
    pub(crate) fn forge_payload(&mut self, payload: Payload) {
        self.payload = payload;
        self.hash = self.calculate_hash();
    }

    pub(crate) fn tamper_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }
}
