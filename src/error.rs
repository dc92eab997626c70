//! Audit Engine Errors
//! Mission: One typed error per failure class so callers can react precisely

use thiserror::Error;

/// Submission fields the operator can correct. Never touches storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("investor id is required")]
    MissingInvestorId,

    #[error("portfolio value is required and must be a positive amount (got {0})")]
    InvalidPortfolioValue(f64),

    #[error("portfolio snapshot contains no valuations")]
    EmptySnapshot,

    #[error("risk level is required when no portfolio snapshot is supplied")]
    MissingRiskLevel,

    #[error("unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Malformed input to the risk or compliance math.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("valuation at index {index} is not a finite number")]
    NonFiniteValue { index: usize },

    #[error("valuation at index {index} is negative ({value})")]
    NegativeValue { index: usize, value: f64 },

    #[error("timestamp at index {index} does not strictly follow the previous point")]
    NonIncreasingTimestamp { index: usize },

    #[error("valuation at index {index} is zero, so the return to the next point is undefined")]
    ZeroValuation { index: usize },

    #[error("portfolio value must be a finite, non-negative amount (got {0})")]
    InvalidPortfolioValue(f64),

    #[error("{metric} evaluated to a non-finite number")]
    NonFiniteMetric { metric: &'static str },
}

/// SQLite failures, reported verbatim with the operation that failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage operation '{op}' failed: {source}")]
    Sqlite {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("stored row has invalid {column} '{value}'")]
    CorruptRow { column: &'static str, value: String },

    #[error("investor '{0}' is not registered")]
    InvestorNotFound(String),
}

impl StorageError {
    pub(crate) fn sqlite(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StorageError::Sqlite { op, source }
    }
}

/// Audit policy values the engines cannot work with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("{field} must be {requirement} (got {value})")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("risk.medium_threshold ({medium}) must not exceed risk.high_threshold ({high})")]
    ThresholdOrder { medium: f64, high: f64 },
}

/// Everything `submit_audit` can report.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("computation failed: {0}")]
    Computation(#[from] ComputationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = ComputationError::ZeroValuation { index: 3 };
        assert!(err.to_string().contains("index 3"));

        let err = StorageError::Sqlite {
            op: "insert audit record",
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(err.to_string().contains("insert audit record"));
    }

    #[test]
    fn test_audit_error_wraps_each_class() {
        let err: AuditError = ValidationError::MissingInvestorId.into();
        assert!(matches!(err, AuditError::Validation(_)));
        assert_eq!(err.to_string(), "validation failed: investor id is required");

        let err: AuditError = ComputationError::InvalidPortfolioValue(-1.0).into();
        assert!(matches!(err, AuditError::Computation(_)));
    }
}
