//! Ledger Snapshots
//!
//! Export of a ledger to a JSON-shaped snapshot and re-verified import.
//! An imported snapshot only becomes a live ledger after every block hash
//! and the whole chain have been checked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::block::{Block, BlockRecord};
use crate::ledger::chain::{AuditLedger, LEDGER_VERSION};
use crate::ledger::report::LedgerStatistics;
use crate::ledger::session::SessionIndex;
use crate::ledger::verify::{self, TamperReport};

/// Transportable ledger snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub is_locked: bool,
    pub chain: Vec<BlockRecord>,
    pub sessions: Vec<(String, Vec<usize>)>,
    /// Informational only; ignored on import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<LedgerStatistics>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Hashes carried by the snapshot, in chain order
    pub fn hashes(&self) -> Vec<&str> {
        self.chain.iter().map(|record| record.hash.as_str()).collect()
    }
}

impl AuditLedger {
    /// Snapshot of the full chain, session index and lock state
    pub fn export(&self) -> LedgerSnapshot {
        let snapshot = LedgerSnapshot {
            version: LEDGER_VERSION.to_string(),
            exported_at: Utc::now(),
            is_locked: self.is_locked(),
            chain: self.to_records(),
            sessions: self.session_index().entries(),
            statistics: Some(self.statistics()),
        };
        debug!("Exported ledger snapshot with {} blocks", snapshot.chain.len());
        snapshot
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// Fails with `HashMismatch` on the first block whose recomputed hash
    /// differs from the one carried, and with `IntegrityViolation` if the
    /// rebuilt chain does not verify. Nothing is installed on failure.
    /// Snapshots carry no credibility threshold, so the imported ledger
    /// starts from the default; see [`AuditLedger::import_with_config`].
    pub fn import(snapshot: &LedgerSnapshot) -> Result<Self> {
        if snapshot.version != LEDGER_VERSION {
            return Err(LedgerError::ValidationError(format!(
                "Unsupported snapshot version: {}",
                snapshot.version
            )));
        }

        let chain = snapshot
            .chain
            .iter()
            .map(Block::from_record)
            .collect::<Result<Vec<Block>>>()?;

        let sessions = rebuild_session_index(&chain, &snapshot.sessions)?;
        let ledger = AuditLedger::from_parts(chain, sessions, snapshot.is_locked);

        let integrity = ledger.verify_integrity();
        if !integrity.valid {
            warn!("Rejected snapshot import: {}", integrity.summary());
            return Err(LedgerError::IntegrityViolation {
                message: "Imported ledger failed integrity verification".to_string(),
                details: Box::new(integrity),
            });
        }

        info!(
            "Imported ledger with {} blocks across {} sessions",
            ledger.len(),
            ledger.session_index().len()
        );
        Ok(ledger)
    }

    /// Import a snapshot and apply the configured credibility threshold
    pub fn import_with_config(snapshot: &LedgerSnapshot, config: &LedgerConfig) -> Result<Self> {
        Ok(Self::import(snapshot)?.with_credibility_threshold(config.credibility_threshold))
    }

    /// Compare against the hashes carried by a reference snapshot
    pub fn detect_tampering_with_snapshot(&self, reference: &LedgerSnapshot) -> TamperReport {
        verify::detect_tampering(self.blocks(), &reference.hashes())
    }

    /// Write a pretty-printed snapshot to `path`
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<LedgerSnapshot> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let snapshot = self.export();
        fs::write(path, snapshot.to_json()?)?;
        info!("Saved ledger snapshot to {}", path.display());
        Ok(snapshot)
    }
}

/// Read a snapshot file without importing it
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<LedgerSnapshot> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        LedgerError::IoError(format!("Failed to read snapshot {}: {}", path.display(), e))
    })?;
    let snapshot = LedgerSnapshot::from_json(&contents)?;
    debug!("Loaded snapshot with {} blocks from {}", snapshot.chain.len(), path.display());
    Ok(snapshot)
}

/// Read and import a snapshot file
pub fn import_snapshot_file(path: impl AsRef<Path>) -> Result<AuditLedger> {
    AuditLedger::import(&load_snapshot(path)?)
}

/// Reinstall session entries as carried, refusing entries that point past
/// the chain, go backwards, name a block of another session, repeat a
/// session, or leave any block unindexed
fn rebuild_session_index(
    chain: &[Block],
    entries: &[(String, Vec<usize>)],
) -> Result<SessionIndex> {
    let mut index = SessionIndex::new();
    let mut indexed = 0;

    for (session_id, positions) in entries {
        if index.contains(session_id) {
            return Err(LedgerError::ValidationError(format!(
                "Session {} appears more than once in the snapshot index",
                session_id
            )));
        }

        let mut last: Option<usize> = None;
        for &position in positions {
            let block = chain.get(position).ok_or_else(|| {
                LedgerError::ValidationError(format!(
                    "Session {} references block {} outside a chain of {} blocks",
                    session_id,
                    position,
                    chain.len()
                ))
            })?;
            if last.is_some_and(|previous| position <= previous) {
                return Err(LedgerError::ValidationError(format!(
                    "Session {} positions are not in append order",
                    session_id
                )));
            }
            if block.session_id() != session_id {
                return Err(LedgerError::ValidationError(format!(
                    "Session {} references block {} of session {}",
                    session_id,
                    position,
                    block.session_id()
                )));
            }
            last = Some(position);
        }
        indexed += positions.len();
        index.install(session_id.clone(), positions.clone());
    }

    // Positions are distinct by now, so a matching count means full coverage
    if indexed != chain.len() {
        return Err(LedgerError::ValidationError(format!(
            "Session index covers {} of {} blocks",
            indexed,
            chain.len()
        )));
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::chain::NewEvent;
    use crate::ledger::event::EventType;

    fn sample_ledger() -> AuditLedger {
        let mut ledger = AuditLedger::new();
        ledger.append(NewEvent::new("S1", EventType::SessionStart)).unwrap();
        ledger.append(NewEvent::new("S2", EventType::SessionStart)).unwrap();
        ledger.append(NewEvent::new("S1", EventType::SessionEnd)).unwrap();
        ledger
    }

    #[test]
    fn test_export_shape() {
        let snapshot = sample_ledger().export();

        assert_eq!(snapshot.version, "1.0.0");
        assert!(!snapshot.is_locked);
        assert_eq!(snapshot.chain.len(), 4);
        assert_eq!(
            snapshot.sessions,
            vec![
                ("SYSTEM".to_string(), vec![0]),
                ("S1".to_string(), vec![1, 3]),
                ("S2".to_string(), vec![2]),
            ]
        );
        assert!(snapshot.chain.iter().all(|record| record.hash_valid));
    }

    #[test]
    fn test_sessions_serialize_as_pairs() {
        let value = serde_json::to_value(sample_ledger().export()).unwrap();
        assert_eq!(value["sessions"][1][0], "S1");
        assert_eq!(value["sessions"][1][1][1], 3);
        assert_eq!(value["isLocked"], false);
    }

    #[test]
    fn test_import_round_trip() {
        let ledger = sample_ledger();
        let imported = AuditLedger::import(&ledger.export()).unwrap();

        assert_eq!(imported.blocks(), ledger.blocks());
        assert_eq!(imported.session_index(), ledger.session_index());
        assert!(imported.verify_integrity().valid);
    }

    #[test]
    fn test_import_keeps_lock() {
        let mut ledger = sample_ledger();
        ledger.lock();

        let mut imported = AuditLedger::import(&ledger.export()).unwrap();
        assert!(imported.is_locked());
        assert!(imported
            .append(NewEvent::new("S1", EventType::SessionResume))
            .is_err());
    }

    #[test]
    fn test_import_rejects_unknown_version() {
        let mut snapshot = sample_ledger().export();
        snapshot.version = "2.0.0".to_string();

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_rejects_out_of_range_session_position() {
        let mut snapshot = sample_ledger().export();
        snapshot.sessions[1].1.push(42);

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_rejects_foreign_session_position() {
        let mut snapshot = sample_ledger().export();
        snapshot.sessions[2].1 = vec![1];

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_rejects_reordered_session_positions() {
        let mut snapshot = sample_ledger().export();
        snapshot.sessions[1].1 = vec![3, 1];

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_rejects_missing_session_entries() {
        let mut snapshot = sample_ledger().export();
        snapshot.sessions.clear();

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_rejects_unindexed_block() {
        let mut snapshot = sample_ledger().export();
        snapshot.sessions[1].1 = vec![3];

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_rejects_repeated_session() {
        let mut snapshot = sample_ledger().export();
        snapshot.sessions[1].1 = vec![1];
        snapshot.sessions.push(("S1".to_string(), vec![3]));

        assert!(matches!(
            AuditLedger::import(&snapshot),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_import_of_empty_ledger() {
        let imported = AuditLedger::import(&AuditLedger::empty().export()).unwrap();
        assert!(imported.is_empty());
        assert!(imported.session_index().is_empty());
    }

    #[test]
    fn test_import_with_config_keeps_threshold() {
        let snapshot = sample_ledger().export();
        let config = LedgerConfig {
            credibility_threshold: 75.0,
            ..LedgerConfig::default()
        };

        let plain = AuditLedger::import(&snapshot).unwrap();
        assert_eq!(plain.credibility_threshold(), 50.0);

        let mut imported = AuditLedger::import_with_config(&snapshot, &config).unwrap();
        assert_eq!(imported.credibility_threshold(), 75.0);
        let block = imported
            .record_credibility_update("S1", 60.0, Default::default())
            .unwrap();
        assert_eq!(block.event_type(), &EventType::CredibilityThresholdBreach);
    }

    #[test]
    fn test_import_ignores_statistics() {
        let mut snapshot = sample_ledger().export();
        snapshot.statistics = None;

        assert!(AuditLedger::import(&snapshot).is_ok());
    }

    #[test]
    fn test_tamper_check_against_snapshot() {
        let ledger = sample_ledger();
        let reference = ledger.export();
        assert!(!ledger.detect_tampering_with_snapshot(&reference).tampered);

        let mut forged = ledger.clone();
        let tail = forged.len() - 1;
        let mut payload = forged.blocks()[tail].payload();
        payload.insert("finalScore".to_string(), serde_json::json!(100));
        forged.blocks_mut()[tail].forge_payload(payload);

        assert!(forged.verify_integrity().valid);
        let report = forged.detect_tampering_with_snapshot(&reference);
        assert!(report.tampered);
        assert_eq!(report.mismatched_indices(), vec![tail]);
    }
}
