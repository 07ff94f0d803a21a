//! Error type for a coverage run.

use std::path::PathBuf;

/// Result type alias for coverage runs.
pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can abort a coverage run.
///
/// There is no partial result: the first error ends the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Talking to the org failed.
    #[error(transparent)]
    Tooling(#[from] apex_coverage_tooling::Error),

    /// A coverage record could not be aggregated.
    #[error(transparent)]
    Core(#[from] apex_coverage_core::Error),

    /// Writing the report failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A run setting has an unusable value.
    #[error("Invalid setting {name}: {message}")]
    Settings { name: &'static str, message: String },

    /// Discovery found nothing to run.
    #[error("No test classes match {pattern}")]
    NoTestClasses { pattern: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn settings(name: &'static str, message: impl Into<String>) -> Self {
        Error::Settings {
            name,
            message: message.into(),
        }
    }
}
