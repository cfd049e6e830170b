//! Ledger Reports
//!
//! Derived, read-only views over a ledger: statistics and per-session
//! audit trails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ledger::block::{Block, BlockRecord};
use crate::ledger::event::{EventSeverity, EventType};
use crate::ledger::verify::VerificationResult;

/// Number of blocks per severity tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
    pub violation: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: EventSeverity) {
        match severity {
            EventSeverity::Info => self.info += 1,
            EventSeverity::Warning => self.warning += 1,
            EventSeverity::Critical => self.critical += 1,
            EventSeverity::Violation => self.violation += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.critical + self.violation
    }
}

/// Ledger-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatistics {
    pub total_blocks: usize,
    pub total_sessions: usize,
    pub event_counts: BTreeMap<String, usize>,
    pub severity_counts: SeverityCounts,
    pub first_block_time: Option<DateTime<Utc>>,
    pub last_block_time: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub integrity: VerificationResult,
}

impl LedgerStatistics {
    pub(crate) fn collect(
        blocks: &[Block],
        total_sessions: usize,
        is_locked: bool,
        integrity: VerificationResult,
    ) -> Self {
        let mut event_counts = BTreeMap::new();
        let mut severity_counts = SeverityCounts::default();

        for block in blocks {
            *event_counts
                .entry(block.event_type().as_str().to_string())
                .or_insert(0) += 1;
            severity_counts.add(block.severity());
        }

        Self {
            total_blocks: blocks.len(),
            total_sessions,
            event_counts,
            severity_counts,
            first_block_time: blocks.first().map(Block::timestamp),
            last_block_time: blocks.last().map(Block::timestamp),
            is_locked,
            integrity,
        }
    }
}

/// One line of a session timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub severity: EventSeverity,
    pub summary: String,
    pub hash: String,
}

impl TimelineEntry {
    fn from_block(block: &Block) -> Self {
        let prefix: String = block.hash().chars().take(16).collect();
        Self {
            time: block.timestamp_iso(),
            event_type: block.event_type().clone(),
            severity: block.severity(),
            summary: block.event_summary().to_string(),
            hash: format!("{}...", prefix),
        }
    }
}

/// Audit trail of a single session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAuditTrail {
    pub session_id: String,
    pub block_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub violations: usize,
    pub warnings: usize,
    pub integrity_valid: bool,
    pub blocks: Vec<BlockRecord>,
    pub timeline: Vec<TimelineEntry>,
}

impl SessionAuditTrail {
    /// `None` when the session has no blocks
    pub(crate) fn build(session_id: &str, blocks: &[&Block], integrity_valid: bool) -> Option<Self> {
        let first = blocks.first()?;
        let last = blocks.last()?;

        let count = |severity: EventSeverity| {
            blocks
                .iter()
                .filter(|block| block.severity() == severity)
                .count()
        };

        Some(Self {
            session_id: session_id.to_string(),
            block_count: blocks.len(),
            start_time: first.timestamp(),
            end_time: last.timestamp(),
            violations: count(EventSeverity::Violation),
            warnings: count(EventSeverity::Warning),
            integrity_valid,
            blocks: blocks.iter().map(|block| block.to_record()).collect(),
            timeline: blocks.iter().map(|block| TimelineEntry::from_block(block)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_counts() {
        let mut counts = SeverityCounts::default();
        counts.add(EventSeverity::Info);
        counts.add(EventSeverity::Violation);
        counts.add(EventSeverity::Violation);

        assert_eq!(counts.info, 1);
        assert_eq!(counts.violation, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_empty_trail_is_none() {
        assert!(SessionAuditTrail::build("S1", &[], true).is_none());
    }

    #[test]
    fn test_timeline_hash_prefix() {
        let block = Block::genesis("genesis-test".to_string(), Default::default());
        let entry = TimelineEntry::from_block(&block);

        assert_eq!(entry.hash.len(), 19);
        assert!(block.hash().starts_with(entry.hash.trim_end_matches("...")));
        assert_eq!(entry.event_type, EventType::Genesis);
    }
}
