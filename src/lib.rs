pub mod config;
pub mod error;
pub mod ledger;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::{AuditLedger, Block, EventSeverity, EventType, LedgerSnapshot, NewEvent};
