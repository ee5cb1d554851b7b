//! Error types for gemtools

use thiserror::Error;

/// Result type alias for gemtools operations
pub type Result<T> = std::result::Result<T, GemError>;

/// Error types that can occur in gemtools
///
/// No error is retried: every variant is either a data problem or an I/O
/// problem that a second attempt would not fix.
#[derive(Debug, Error)]
pub enum GemError {
    /// I/O error (opening or reading a plain source)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decompression failed part way through a compressed source
    ///
    /// The stream that produced it is unusable afterwards.
    #[error("Corrupt compressed stream after line {line}: {msg}")]
    CorruptStream {
        /// Last line successfully read before the failure
        line: usize,
        /// Decoder message
        msg: String,
    },

    /// A single map line could not be parsed
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// Line number (1-based, 0 when parsed outside a stream)
        line: usize,
        /// What was wrong with the record
        reason: String,
        /// The offending raw text
        record: String,
    },

    /// Filter parameters that can never accept anything
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl GemError {
    /// Build a `MalformedRecord` error for `record` with no line number
    pub(crate) fn malformed(record: &str, reason: impl Into<String>) -> Self {
        GemError::MalformedRecord {
            line: 0,
            reason: reason.into(),
            record: record.to_string(),
        }
    }

    /// Attach a line number to a `MalformedRecord` error
    ///
    /// Other variants are returned unchanged.
    pub fn at_line(self, line_number: usize) -> Self {
        match self {
            GemError::MalformedRecord { reason, record, .. } => GemError::MalformedRecord {
                line: line_number,
                reason,
                record,
            },
            other => other,
        }
    }

    /// Returns `true` for errors that only affect a single record
    pub fn is_record_error(&self) -> bool {
        matches!(self, GemError::MalformedRecord { .. })
    }
}
