//! Error types for typedsql

use thiserror::Error;

/// Result type alias for typedsql operations
pub type SqResult<T> = Result<T, SqError>;

/// Errors raised while building, rendering or executing statements.
#[derive(Debug, Error)]
pub enum SqError {
    /// The statement kind does not support the requested operation
    /// (e.g. fetchable-field negotiation on an INSERT).
    #[error("unsupported operation")]
    Unsupported,

    /// Returned from a row mapper to stop iteration without failing the fetch.
    #[error("skip remaining rows")]
    SkipRows,

    /// Malformed expression tree or statement
    #[error("Build error: {0}")]
    Build(String),

    /// Error raised by caller code inside a mapper callback
    #[error(transparent)]
    Domain(Box<dyn std::error::Error + Send + Sync>),

    /// Query execution error from tokio-postgres
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Error reported by any other database handle
    #[error("Driver error: {0}")]
    Driver(String),

    /// Column value could not be decoded from the driver's row
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Row mapper scanned a value into an incompatible destination
    #[error("please check if your row mapper is correct:\n{details}\n{message}")]
    Scan { details: String, message: String },

    /// The context was cancelled before the call completed
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed before the call completed
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqError {
    /// Create a construction error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Wrap a caller-defined error so it can travel through a mapper callback
    pub fn domain(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Domain(Box::new(err))
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is the unsupported-operation sentinel
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// Check if this is the skip-rows sentinel
    pub fn is_skip_rows(&self) -> bool {
        matches!(self, Self::SkipRows)
    }

    /// Check if the context was cancelled or timed out
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Borrow the wrapped domain error as a concrete type.
    pub fn downcast_domain_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Domain(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("row {0} is invalid")]
    struct InvalidRow(usize);

    #[test]
    fn domain_errors_round_trip_through_downcast() {
        let err = SqError::domain(InvalidRow(2));
        assert_eq!(err.to_string(), "row 2 is invalid");
        assert_eq!(err.downcast_domain_ref::<InvalidRow>().map(|e| e.0), Some(2));
        assert!(!err.is_skip_rows());
    }

    #[test]
    fn sentinels_are_classified() {
        assert!(SqError::Unsupported.is_unsupported());
        assert!(SqError::SkipRows.is_skip_rows());
        assert!(SqError::DeadlineExceeded.is_cancelled());
        assert!(!SqError::build("x").is_unsupported());
    }
}
