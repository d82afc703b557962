//! Error types for dump ingestion
//!
//! Per-record failures carry the entity and the 1-based source line so the
//! operator can find the offending record. There is no retry anywhere: a
//! returned error ends the run unless the skip policy absorbs it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Failure of a single record before it reaches the store.
///
/// Raised by the record parser and the type coercer, which see one line at
/// a time and know nothing about its position in the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("not a well-formed record: {0}")]
    Unparsable(String),

    #[error("column '{column}' has malformed timestamp '{value}'")]
    MalformedTimestamp { column: String, value: String },
}

impl RecordError {
    pub fn unparsable(msg: impl Into<String>) -> Self {
        Self::Unparsable(msg.into())
    }

    /// Attach the entity and line the record came from
    pub fn at(self, entity: &str, line: usize) -> IngestError {
        match self {
            RecordError::Unparsable(reason) => IngestError::UnparsableRecord {
                entity: entity.to_string(),
                line,
                reason,
            },
            RecordError::MalformedTimestamp { column, value } => IngestError::MalformedTimestamp {
                entity: entity.to_string(),
                line,
                column,
                value,
            },
        }
    }
}

/// Main error type for a load run
#[derive(Error, Debug)]
pub enum IngestError {
    /// Unknown entity or otherwise invalid run configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unparsable record in {entity} at line {line}: {reason}")]
    UnparsableRecord {
        entity: String,
        line: usize,
        reason: String,
    },

    #[error("Malformed timestamp in {entity} at line {line}: column '{column}' = '{value}'")]
    MalformedTimestamp {
        entity: String,
        line: usize,
        column: String,
        value: String,
    },

    /// The store rejected one record's insert (duplicate key, datatype
    /// mismatch, unknown column)
    #[error("Store rejected {entity} record at line {line}: {source}")]
    StoreConstraintViolation {
        entity: String,
        line: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Cannot read source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the error concerns a single record and may be skipped
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            IngestError::UnparsableRecord { .. }
                | IngestError::MalformedTimestamp { .. }
                | IngestError::StoreConstraintViolation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_gains_context() {
        let err = RecordError::MalformedTimestamp {
            column: "date".to_string(),
            value: "yesterday".to_string(),
        }
        .at("badges", 12);

        assert!(err.is_per_record());
        let msg = err.to_string();
        assert!(msg.contains("badges"));
        assert!(msg.contains("line 12"));
        assert!(msg.contains("yesterday"));
    }

    #[test]
    fn test_configuration_is_fatal() {
        let err = IngestError::config("unknown entity 'widgets'");
        assert!(!err.is_per_record());
        assert_eq!(err.to_string(), "Configuration error: unknown entity 'widgets'");
    }
}
