//! Error types for the skinfall wagering engine.
//!
//! One crate-level taxonomy; every service returns `EngineResult` and the API
//! layer maps variants onto HTTP statuses.

use thiserror::Error;

/// Root error type for all engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input (stake, price, quantity).
    #[error("{0}")]
    Validation(String),

    /// A debit would drive the balance negative.
    #[error("Insufficient balance")]
    InsufficientFunds,

    /// Case, item, listing or account does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Level gate or ownership mismatch.
    #[error("{0}")]
    Forbidden(String),

    /// Bet already placed this round, payout already issued, etc.
    #[error("{0}")]
    Duplicate(String),

    /// A step of a multi-account transaction failed; state was rolled back.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Configuration loading or validation failure.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        EngineError::Forbidden(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        EngineError::Duplicate(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        EngineError::Transaction(msg.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Configuration(e.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::Configuration(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::validation("bet must be between 1 and 1000000");
        assert_eq!(err.to_string(), "bet must be between 1 and 1000000");

        let err = EngineError::NotFound("Listing");
        assert_eq!(err.to_string(), "Listing not found");
    }

    #[test]
    fn test_insufficient_funds_message() {
        assert_eq!(
            EngineError::InsufficientFunds.to_string(),
            "Insufficient balance"
        );
    }

    #[test]
    fn test_transaction_error_wraps_detail() {
        let err = EngineError::transaction("seller vanished mid-purchase");
        assert!(err.to_string().contains("seller vanished"));
    }
}
