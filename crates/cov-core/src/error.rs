//! Error types for apex-coverage-core.

/// Result type alias for aggregation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for aggregation operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a malformed-record error for a missing field.
    ///
    /// `record` is whatever identifies the offending record best (its id or
    /// name); it may be empty when neither is present.
    pub fn malformed(field: &'static str, record: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRecord {
            field,
            record: record.into(),
        })
    }

    /// Returns true if this error was caused by a malformed input record.
    pub fn is_malformed_record(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedRecord { .. })
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A coverage record is missing a required field.
    #[error("Malformed coverage record{}: missing {field}", if record.is_empty() { String::new() } else { format!(" '{}'", record) })]
    MalformedRecord {
        field: &'static str,
        record: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = Error::malformed("Coverage.coveredLines", "01p000000000001AAA");
        assert!(err.is_malformed_record());
        assert_eq!(
            err.to_string(),
            "Malformed coverage record '01p000000000001AAA': missing Coverage.coveredLines"
        );

        let err = Error::malformed("ApexClassOrTrigger.Name", "");
        assert_eq!(
            err.to_string(),
            "Malformed coverage record: missing ApexClassOrTrigger.Name"
        );
    }
}
