use thiserror::Error;

use crate::ledger::verify::VerificationResult;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed input to block construction or append.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Append attempted after the ledger was locked.
    #[error("Immutability violation: {0}")]
    ImmutabilityViolation(String),

    /// A reconstructed block does not hash to the value carried with it.
    #[error("Hash mismatch at block {index}: expected {expected}, got {actual}")]
    HashMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    /// A reconstructed ledger failed whole-chain verification.
    #[error("Integrity violation: {message}")]
    IntegrityViolation {
        message: String,
        details: Box<VerificationResult>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LedgerError {
    pub fn missing_field(field: &str) -> Self {
        Self::ValidationError(format!("{} is required", field))
    }

    pub fn ledger_locked() -> Self {
        Self::ImmutabilityViolation(
            "Cannot append to locked ledger. The ledger has been finalized.".to_string(),
        )
    }

    /// Stable machine-readable code, for collaborators that map errors onto
    /// their own transport (status codes, exit codes).
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ImmutabilityViolation(_) => "IMMUTABILITY_VIOLATION",
            Self::HashMismatch { .. } => "HASH_MISMATCH",
            Self::IntegrityViolation { .. } => "INTEGRITY_VIOLATION",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::ledger_locked().code(), "IMMUTABILITY_VIOLATION");
        assert_eq!(
            LedgerError::missing_field("Session ID").code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_hash_mismatch_display() {
        let err = LedgerError::HashMismatch {
            index: 3,
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Hash mismatch at block 3: expected abc, got def"
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: LedgerError = json_err.into();
        assert!(matches!(err, LedgerError::SerializationError(_)));
    }
}
