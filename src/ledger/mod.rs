//! Audit Ledger Engine
//!
//! Append-only, tamper-evident ledger of proctoring events kept as a
//! SHA-256 hash chain of immutable blocks, with a per-session index,
//! integrity verification and verified snapshot import.

pub mod block;
pub mod chain;
pub mod event;
pub mod report;
pub mod session;
pub mod shared;
pub mod snapshot;
pub mod verify;

pub use block::{Block, BlockParams, BlockRecord, Payload, GENESIS_PREVIOUS_HASH, SYSTEM_SESSION_ID};
pub use chain::{AuditLedger, NewEvent, DEFAULT_CREDIBILITY_THRESHOLD, LEDGER_VERSION};
pub use event::{BehaviorClass, EventSeverity, EventType};
pub use report::{LedgerStatistics, SessionAuditTrail, SeverityCounts, TimelineEntry};
pub use session::SessionIndex;
pub use shared::SharedLedger;
pub use snapshot::{import_snapshot_file, load_snapshot, LedgerSnapshot};
pub use verify::{
    detect_tampering, verify_chain, verify_positions, BrokenLink, InvalidBlock, TamperDifference,
    TamperReport, VerificationResult,
};
