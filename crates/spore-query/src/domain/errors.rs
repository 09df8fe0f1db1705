//! # Domain Errors
//!
//! Error types for Spore record retrieval and transaction submission.

use thiserror::Error;

/// Record retrieval error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The cell matched the record script but its payload is not a valid
    /// record layout.
    ///
    /// Bulk scans skip such cells; single-record lookups surface it.
    #[error("Malformed record: {reason}")]
    MalformedRecord {
        /// What was wrong with the payload
        reason: String,
    },

    /// Indexer or node endpoint failed, or answered with something we
    /// could not parse. Never retried internally.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Transaction history ran out before the requested number of records
    /// was found.
    #[error("Transaction history exhausted: found {found} of {requested} records")]
    ExhaustedHistory {
        /// Records accumulated before history ran out
        found: usize,
        /// Records requested
        requested: usize,
    },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RecordError {
    /// Shorthand for [`RecordError::MalformedRecord`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Whether this error is a decode failure (skippable during scans).
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}

/// Errors raised while signing or broadcasting a transaction.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The wallet owner declined to sign.
    #[error("User rejected the signing request")]
    UserRejected,

    /// The signing service failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The network refused the signed transaction.
    #[error("Transaction rejected by network: {0}")]
    RejectedByNetwork(String),

    /// Capacity arithmetic left the u64 range.
    #[error("Capacity overflow while applying margin change")]
    CapacityOverflow,

    /// The record cell holds less capacity than its bytes occupy.
    #[error("Record cell is under-funded: capacity below occupied")]
    UnderfundedCell,

    /// The skeleton does not say which output carries the record.
    #[error("Transaction skeleton has no record output")]
    MissingOutputIndex,

    /// The record output index does not fit an out point.
    #[error("Output index {0} out of range")]
    InvalidOutputIndex(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_error() {
        let err = RecordError::malformed("truncated header");
        assert!(err.is_malformed());
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn test_source_unavailable_not_malformed() {
        let err = RecordError::SourceUnavailable("connection refused".to_string());
        assert!(!err.is_malformed());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_exhausted_history_error() {
        let err = RecordError::ExhaustedHistory {
            found: 3,
            requested: 10,
        };
        assert!(err.to_string().contains("3 of 10"));
    }

    #[test]
    fn test_submission_errors() {
        assert!(SubmissionError::UserRejected.to_string().contains("rejected"));
        let err = SubmissionError::RejectedByNetwork("PoolIsFull".to_string());
        assert!(err.to_string().contains("PoolIsFull"));
    }
}
