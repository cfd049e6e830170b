//! Ledger Verification
//!
//! Integrity checks over a sequence of blocks: whole-chain, per-session and
//! divergence against a reference copy.
//!
//! Note on the tail block: rewriting a historical block's content *and*
//! re-sealing its hash is caught by the successor's `previousHash`, but the
//! current tail has no successor. A forged tail therefore passes
//! [`verify_chain`] and is only exposed by [`detect_tampering`] against a
//! reference copy kept outside the ledger (for example an earlier export).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ledger::block::{Block, GENESIS_PREVIOUS_HASH};

/// Block whose stored hash no longer matches its content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidBlock {
    pub index: usize,
    pub transaction_id: String,
    pub reason: String,
}

/// Block whose link to its predecessor is broken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub index: usize,
    pub expected_previous_hash: String,
    pub actual_previous_hash: String,
    pub reason: String,
}

/// Outcome of a whole-chain verification run. Always recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub valid: bool,
    pub total_blocks: usize,
    pub invalid_blocks: Vec<InvalidBlock>,
    pub broken_links: Vec<BrokenLink>,
    pub checked_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Positions with a hash mismatch
    pub fn invalid_indices(&self) -> Vec<usize> {
        self.invalid_blocks.iter().map(|b| b.index).collect()
    }

    /// Positions with a broken chain link
    pub fn broken_link_indices(&self) -> Vec<usize> {
        self.broken_links.iter().map(|l| l.index).collect()
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.valid {
            format!("Ledger is valid ({} blocks)", self.total_blocks)
        } else {
            format!(
                "Ledger is invalid ({} blocks): {} hash mismatches, {} broken links",
                self.total_blocks,
                self.invalid_blocks.len(),
                self.broken_links.len()
            )
        }
    }
}

/// Verify every block's hash and its link to the predecessor.
///
/// A block can show up both as invalid and as a broken link.
pub fn verify_chain(blocks: &[Block]) -> VerificationResult {
    let mut invalid_blocks = Vec::new();
    let mut broken_links = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        let previous = if i > 0 { blocks.get(i - 1) } else { None };

        if !block.validate_hash() {
            invalid_blocks.push(InvalidBlock {
                index: i,
                transaction_id: block.transaction_id().to_string(),
                reason: "Hash mismatch - block data may have been tampered".to_string(),
            });
        }

        if !block.validate_chain_link(previous) {
            broken_links.push(BrokenLink {
                index: i,
                expected_previous_hash: previous
                    .map(|p| p.hash().to_string())
                    .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string()),
                actual_previous_hash: block.previous_hash().to_string(),
                reason: "Chain link broken - previous hash does not match".to_string(),
            });
        }
    }

    let result = VerificationResult {
        valid: invalid_blocks.is_empty() && broken_links.is_empty(),
        total_blocks: blocks.len(),
        invalid_blocks,
        broken_links,
        checked_at: Utc::now(),
    };

    if result.valid {
        debug!("{}", result.summary());
    } else {
        warn!("{}", result.summary());
    }
    result
}

/// Check only the hashes of the blocks at `positions`.
///
/// Link checks are skipped: a session's blocks interleave with other
/// sessions and are not index-contiguous.
pub fn verify_positions(blocks: &[Block], positions: &[usize]) -> bool {
    positions.iter().all(|&position| {
        blocks
            .get(position)
            .map(Block::validate_hash)
            .unwrap_or(false)
    })
}

/// Single divergence between a ledger and its reference copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TamperDifference {
    HashMismatch {
        index: usize,
        #[serde(rename = "currentHash")]
        current_hash: String,
        #[serde(rename = "referenceHash")]
        reference_hash: String,
    },
    LengthMismatch {
        current: usize,
        reference: usize,
    },
}

/// Result of comparing a ledger to a reference copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperReport {
    pub tampered: bool,
    pub differences: Vec<TamperDifference>,
}

impl TamperReport {
    /// Positions whose hash differs from the reference
    pub fn mismatched_indices(&self) -> Vec<usize> {
        self.differences
            .iter()
            .filter_map(|d| match d {
                TamperDifference::HashMismatch { index, .. } => Some(*index),
                TamperDifference::LengthMismatch { .. } => None,
            })
            .collect()
    }

    pub fn length_mismatch(&self) -> bool {
        self.differences
            .iter()
            .any(|d| matches!(d, TamperDifference::LengthMismatch { .. }))
    }
}

/// Compare block hashes position by position up to the shorter length,
/// then flag a length difference.
///
/// Only says *that* a stored digest diverges, not which field changed.
pub fn detect_tampering(current: &[Block], reference_hashes: &[&str]) -> TamperReport {
    let mut differences = Vec::new();

    for (i, (block, reference_hash)) in current.iter().zip(reference_hashes).enumerate() {
        if block.hash() != *reference_hash {
            differences.push(TamperDifference::HashMismatch {
                index: i,
                current_hash: block.hash().to_string(),
                reference_hash: reference_hash.to_string(),
            });
        }
    }

    if current.len() != reference_hashes.len() {
        differences.push(TamperDifference::LengthMismatch {
            current: current.len(),
            reference: reference_hashes.len(),
        });
    }

    let report = TamperReport {
        tampered: !differences.is_empty(),
        differences,
    };

    if report.tampered {
        warn!(
            "Tampering detected: {} differences against reference",
            report.differences.len()
        );
    } else {
        info!("No tampering detected across {} blocks", current.len());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::block::Payload;
    use crate::ledger::chain::{AuditLedger, NewEvent};
    use crate::ledger::event::EventType;
    use serde_json::json;

    fn populated_ledger() -> AuditLedger {
        let mut ledger = AuditLedger::new();
        ledger
            .append(NewEvent::new("S1", EventType::SessionStart))
            .unwrap();
        ledger
            .append(NewEvent::new("S2", EventType::SessionStart))
            .unwrap();
        ledger
            .append(NewEvent::new("S1", EventType::TabSwitch))
            .unwrap();
        ledger
            .append(NewEvent::new("S1", EventType::SessionEnd))
            .unwrap();
        ledger
    }

    fn altered_payload() -> Payload {
        let mut payload = Payload::new();
        payload.insert("score".to_string(), json!(100));
        payload
    }

    #[test]
    fn test_fresh_chain_is_valid() {
        let ledger = populated_ledger();
        let result = verify_chain(ledger.blocks());

        assert!(result.valid);
        assert_eq!(result.total_blocks, 5);
        assert!(result.invalid_blocks.is_empty());
        assert!(result.broken_links.is_empty());
        assert!(result.summary().contains("valid (5 blocks)"));
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let result = verify_chain(&[]);
        assert!(result.valid);
        assert_eq!(result.total_blocks, 0);
    }

    #[test]
    fn test_payload_tamper_detected_by_hash() {
        let mut ledger = populated_ledger();
        ledger.blocks_mut()[2].tamper_payload(altered_payload());

        let result = verify_chain(ledger.blocks());
        assert!(!result.valid);
        assert_eq!(result.invalid_indices(), vec![2]);
        assert!(result.broken_links.is_empty());
        assert!(!ledger.blocks()[2].validate_hash());
    }

    #[test]
    fn test_resealed_historical_block_breaks_successor_link() {
        let mut ledger = populated_ledger();
        ledger.blocks_mut()[2].forge_payload(altered_payload());

        let result = verify_chain(ledger.blocks());
        assert!(!result.valid);
        assert!(result.invalid_blocks.is_empty());
        assert_eq!(result.broken_link_indices(), vec![3]);
    }

    #[test]
    fn test_forged_tail_passes_chain_check_but_not_reference_check() {
        let reference = populated_ledger();
        let mut ledger = reference.clone();
        let tail = ledger.len() - 1;
        ledger.blocks_mut()[tail].forge_payload(altered_payload());

        assert!(verify_chain(ledger.blocks()).valid);

        let reference_hashes: Vec<&str> = reference.blocks().iter().map(Block::hash).collect();
        let report = detect_tampering(ledger.blocks(), &reference_hashes);
        assert!(report.tampered);
        assert_eq!(report.mismatched_indices(), vec![tail]);
        assert!(!report.length_mismatch());
    }

    #[test]
    fn test_broken_previous_hash_reported() {
        let mut ledger = populated_ledger();
        ledger.blocks_mut()[1].tamper_previous_hash("feedface");

        let result = verify_chain(ledger.blocks());
        assert_eq!(result.invalid_indices(), vec![1]);
        assert_eq!(result.broken_link_indices(), vec![1]);
        assert_eq!(result.broken_links[0].actual_previous_hash, "feedface");
        assert_eq!(
            result.broken_links[0].expected_previous_hash,
            ledger.blocks()[0].hash()
        );
    }

    #[test]
    fn test_session_positions_check_only_hashes() {
        let mut ledger = populated_ledger();
        let s1 = ledger.session_positions("S1").to_vec();
        let s2 = ledger.session_positions("S2").to_vec();

        assert!(verify_positions(ledger.blocks(), &s1));

        ledger.blocks_mut()[3].tamper_payload(altered_payload());
        assert!(!verify_positions(ledger.blocks(), &s1));
        assert!(verify_positions(ledger.blocks(), &s2));
    }

    #[test]
    fn test_detect_truncation() {
        let reference = populated_ledger();
        let truncated = &reference.blocks()[..3];
        let reference_hashes: Vec<&str> = reference.blocks().iter().map(Block::hash).collect();

        let report = detect_tampering(truncated, &reference_hashes);
        assert!(report.tampered);
        assert!(report.mismatched_indices().is_empty());
        assert_eq!(
            report.differences,
            vec![TamperDifference::LengthMismatch {
                current: 3,
                reference: 5
            }]
        );
    }

    #[test]
    fn test_tamper_difference_serialization() {
        let diff = TamperDifference::HashMismatch {
            index: 4,
            current_hash: "aa".to_string(),
            reference_hash: "bb".to_string(),
        };
        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(value["type"], "hash_mismatch");
        assert_eq!(value["currentHash"], "aa");
        assert_eq!(value["referenceHash"], "bb");
    }
}
