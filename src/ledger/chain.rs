//! Audit Ledger
//!
//! The append-only chain of blocks together with its session index and
//! the one-way lock.
//!
//! The ledger is a single-writer structure with no internal locking. An
//! append pushes the block and records it in the session index as one step,
//! after every fallible check has passed. Multi-threaded hosts must
//! serialize access themselves, see [`crate::ledger::shared::SharedLedger`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::block::{Block, BlockParams, BlockRecord, Payload, GENESIS_PREVIOUS_HASH};
use crate::ledger::event::{BehaviorClass, EventSeverity, EventType};
use crate::ledger::report::{LedgerStatistics, SessionAuditTrail};
use crate::ledger::session::SessionIndex;
use crate::ledger::verify::{self, TamperReport, VerificationResult};

/// Ledger format version stamped into genesis and snapshots
pub const LEDGER_VERSION: &str = "1.0.0";

/// Credibility score below which an update counts as a breach
pub const DEFAULT_CREDIBILITY_THRESHOLD: f64 = 50.0;

/// Event submitted for appending. The ledger assigns index, previous hash
/// and transaction id.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub session_id: String,
    pub event_type: EventType,
    pub event_summary: Option<String>,
    pub payload: Payload,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn new(session_id: impl Into<String>, event_type: impl Into<EventType>) -> Self {
        Self {
            session_id: session_id.into(),
            event_type: event_type.into(),
            event_summary: None,
            payload: Payload::new(),
            timestamp: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.event_summary = Some(summary.into());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Append-only, hash-linked audit ledger
#[derive(Debug, Clone)]
pub struct AuditLedger {
    chain: Vec<Block>,
    sessions: SessionIndex,
    locked: bool,
    credibility_threshold: f64,
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLedger {
    /// Create a ledger seeded with its genesis block
    pub fn new() -> Self {
        let mut ledger = Self::empty();

        let mut payload = Payload::new();
        payload.insert("version".to_string(), json!(LEDGER_VERSION));
        payload.insert("createdAt".to_string(), json!(now_iso()));

        let genesis = Block::genesis(format!("genesis-{}", Uuid::new_v4()), payload);
        ledger.sessions.record(genesis.session_id(), 0);
        info!("Audit ledger initialized with genesis block {}", genesis.hash());
        ledger.chain.push(genesis);
        ledger
    }

    /// Create a ledger without a genesis block, the starting point for import
    pub fn empty() -> Self {
        Self {
            chain: Vec::new(),
            sessions: SessionIndex::new(),
            locked: false,
            credibility_threshold: DEFAULT_CREDIBILITY_THRESHOLD,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new().with_credibility_threshold(config.credibility_threshold)
    }

    pub fn with_credibility_threshold(mut self, threshold: f64) -> Self {
        self.credibility_threshold = threshold;
        self
    }

    pub(crate) fn from_parts(chain: Vec<Block>, sessions: SessionIndex, locked: bool) -> Self {
        Self {
            chain,
            sessions,
            locked,
            credibility_threshold: DEFAULT_CREDIBILITY_THRESHOLD,
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn credibility_threshold(&self) -> f64 {
        self.credibility_threshold
    }

    pub fn genesis_block(&self) -> Option<&Block> {
        self.chain.first()
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.session_ids()
    }

    pub fn session_index(&self) -> &SessionIndex {
        &self.sessions
    }

    /// Append an event as a new block
    pub fn append(&mut self, event: NewEvent) -> Result<&Block> {
        if self.locked {
            warn!(
                "Rejected append for session {} on locked ledger",
                event.session_id
            );
            return Err(LedgerError::ledger_locked());
        }
        if event.session_id.is_empty() {
            return Err(LedgerError::missing_field("Session ID"));
        }
        if event.event_type.is_empty() {
            return Err(LedgerError::missing_field("Event type"));
        }

        let index = self.chain.len();
        let previous_hash = self
            .chain
            .last()
            .map(|block| block.hash().to_string())
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string());

        let block = Block::new(BlockParams {
            index,
            transaction_id: Uuid::new_v4().to_string(),
            session_id: event.session_id,
            event_type: event.event_type,
            event_summary: event.event_summary,
            payload: event.payload,
            timestamp: event.timestamp,
            previous_hash,
        })?;

        self.sessions.record(block.session_id(), index);
        self.chain.push(block);

        let block = &self.chain[index];
        debug!(
            "Appended block {} ({}) for session {}",
            index,
            block.event_type(),
            block.session_id()
        );
        Ok(block)
    }

    /// Finalize the ledger; every later append fails. Irreversible.
    pub fn lock(&mut self) {
        if !self.locked {
            self.locked = true;
            info!("Audit ledger locked at {} blocks", self.chain.len());
        }
    }

    pub fn get_block(&self, index: usize) -> Option<&Block> {
        self.chain.get(index)
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|block| block.hash() == hash)
    }

    pub fn get_block_by_transaction_id(&self, transaction_id: &str) -> Option<&Block> {
        self.chain
            .iter()
            .find(|block| block.transaction_id() == transaction_id)
    }

    /// Blocks of one session in append order; empty for unknown sessions
    pub fn get_session_blocks(&self, session_id: &str) -> Vec<&Block> {
        self.sessions
            .positions(session_id)
            .iter()
            .filter_map(|&position| self.chain.get(position))
            .collect()
    }

    pub fn session_positions(&self, session_id: &str) -> &[usize] {
        self.sessions.positions(session_id)
    }

    pub fn filter_by_event_type(&self, event_types: &[EventType]) -> Vec<&Block> {
        self.chain
            .iter()
            .filter(|block| event_types.contains(block.event_type()))
            .collect()
    }

    pub fn violations(&self) -> Vec<&Block> {
        self.chain
            .iter()
            .filter(|block| block.severity() == EventSeverity::Violation)
            .collect()
    }

    /// Blocks with `start <= timestamp <= end`
    pub fn blocks_in_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Block> {
        self.chain
            .iter()
            .filter(|block| block.timestamp() >= start && block.timestamp() <= end)
            .collect()
    }

    /// Whole-chain hash and link verification
    pub fn verify_integrity(&self) -> VerificationResult {
        verify::verify_chain(&self.chain)
    }

    /// Hash-only verification of one session's blocks
    pub fn verify_session_integrity(&self, session_id: &str) -> bool {
        verify::verify_positions(&self.chain, self.sessions.positions(session_id))
    }

    /// Compare against a reference copy of the chain
    pub fn detect_tampering(&self, reference: &[Block]) -> TamperReport {
        let reference_hashes: Vec<&str> = reference.iter().map(Block::hash).collect();
        verify::detect_tampering(&self.chain, &reference_hashes)
    }

    pub fn statistics(&self) -> LedgerStatistics {
        LedgerStatistics::collect(
            &self.chain,
            self.sessions.len(),
            self.locked,
            self.verify_integrity(),
        )
    }

    pub fn session_audit_trail(&self, session_id: &str) -> Option<SessionAuditTrail> {
        let blocks = self.get_session_blocks(session_id);
        SessionAuditTrail::build(
            session_id,
            &blocks,
            self.verify_session_integrity(session_id),
        )
    }

    pub fn record_session_start(&mut self, session_id: &str, metadata: Payload) -> Result<&Block> {
        let mut payload = Payload::new();
        payload.insert("startTime".to_string(), json!(now_iso()));
        payload.extend(metadata);
        self.append(NewEvent::new(session_id, EventType::SessionStart).with_payload(payload))
    }

    pub fn record_session_end(&mut self, session_id: &str, metadata: Payload) -> Result<&Block> {
        let mut payload = Payload::new();
        payload.insert("endTime".to_string(), json!(now_iso()));
        payload.extend(metadata);
        self.append(NewEvent::new(session_id, EventType::SessionEnd).with_payload(payload))
    }

    /// Face detection event such as `face_lost` or `multiple_faces`
    pub fn record_face_event(
        &mut self,
        session_id: &str,
        event_type: EventType,
        data: Payload,
    ) -> Result<&Block> {
        self.append(NewEvent::new(session_id, event_type).with_payload(data))
    }

    pub fn record_behavior(
        &mut self,
        session_id: &str,
        classification: BehaviorClass,
        data: Payload,
    ) -> Result<&Block> {
        let mut payload = Payload::new();
        payload.insert("classification".to_string(), json!(classification.as_str()));
        payload.extend(data);
        self.append(NewEvent::new(session_id, classification.event_type()).with_payload(payload))
    }

    /// Record a credibility score. Scores under the threshold (the payload's
    /// `threshold` field, else the ledger default) become a breach event.
    pub fn record_credibility_update(
        &mut self,
        session_id: &str,
        score: f64,
        data: Payload,
    ) -> Result<&Block> {
        let threshold = data
            .get("threshold")
            .and_then(Value::as_f64)
            .unwrap_or(self.credibility_threshold);
        let event_type = if score < threshold {
            EventType::CredibilityThresholdBreach
        } else {
            EventType::CredibilityUpdate
        };

        let mut payload = Payload::new();
        payload.insert("score".to_string(), json!(score));
        payload.insert("threshold".to_string(), json!(threshold));
        payload.extend(data);
        self.append(NewEvent::new(session_id, event_type).with_payload(payload))
    }

    /// Browser security event such as `tab_switch` or `copy_attempt`
    pub fn record_security_event(
        &mut self,
        session_id: &str,
        event_type: EventType,
        data: Payload,
    ) -> Result<&Block> {
        let mut payload = Payload::new();
        payload.insert("timestamp".to_string(), json!(now_iso()));
        payload.extend(data);
        self.append(NewEvent::new(session_id, event_type).with_payload(payload))
    }

    /// Projections of every block, in order
    pub fn to_records(&self) -> Vec<BlockRecord> {
        self.chain.iter().map(Block::to_record).collect()
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
impl AuditLedger {
    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.chain
    }
}
