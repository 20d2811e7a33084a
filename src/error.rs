//! Error taxonomy for construction and ingestion.
//!
//! Only configuration and ingestion failures surface as [`GeocodeError`].
//! Data-quality problems (bad rows, unknown codes) and snapshot read failures
//! are recovered where they happen and only logged.

use std::path::PathBuf;

/// Errors from building a [`GeocodeService`](crate::GeocodeService).
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// I/O error on a local file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A required reference file could not be used.
    #[error("Reference table {path} is malformed: {reason}")]
    MalformedReference {
        /// Path of the reference file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// HTTP transport error.
    #[cfg(feature = "builder")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The byte source has nothing for this URL.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The downloaded city archive could not be unpacked.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The delimited-text reader failed on the underlying stream.
    #[error("Row reading error: {0}")]
    Rows(#[from] csv::Error),

    /// Snapshot encoding error.
    #[error("Snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GeocodeError>;

impl GeocodeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
