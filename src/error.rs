//! Error types for invoice-dl
//!
//! This module provides the error taxonomy for the pipeline:
//! - Transport and remote-status failures talking to the invoice service
//! - Malformed seed records rejected by the due-date filter
//! - Per-invoice and aggregate download failures
//! - Local filesystem failures writing invoices or the export file

use std::fmt;
use thiserror::Error;

/// Result type alias for invoice-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for invoice-dl
///
/// Each variant corresponds to one failure kind the pipeline can surface at the
/// process boundary. Use [`Error::error_code`] for a stable machine-readable name.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// The request to the remote service could not complete
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service answered with a non-success status
    #[error("remote service returned {status}: {body}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// A seed record could not be turned into an invoice record
    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord {
        /// Position of the record in the seed payload
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A single invoice could not be downloaded or saved
    #[error("failed to download {filename}: {cause}")]
    Failed {
        /// Derived filename of the invoice
        filename: String,
        /// Why the unit failed
        cause: String,
    },

    /// One or more invoices failed after every unit was drained
    #[error(
        "{} of {attempted} invoice downloads failed: {}",
        .failures.len(),
        FailedList(.failures)
    )]
    Incomplete {
        /// Number of download units that were attempted
        attempted: usize,
        /// Every unit that failed, in completion order
        failures: Vec<FailedDownload>,
    },
}

/// A single failed download unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedDownload {
    /// Derived filename (may be empty when the URL had no usable segment)
    pub filename: String,
    /// Why the unit failed
    pub cause: String,
}

impl From<FailedDownload> for DownloadError {
    fn from(failure: FailedDownload) -> Self {
        DownloadError::Failed {
            filename: failure.filename,
            cause: failure.cause,
        }
    }
}

struct FailedList<'a>(&'a [FailedDownload]);

impl fmt::Display for FailedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if failure.filename.is_empty() {
                f.write_str("<unnamed>")?;
            } else {
                f.write_str(&failure.filename)?;
            }
        }
        Ok(())
    }
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transport(_) => "transport_error",
            Error::Remote { .. } => "remote_error",
            Error::MalformedRecord { .. } => "malformed_record",
            Error::Download(e) => match e {
                DownloadError::Failed { .. } => "download_failed",
                DownloadError::Incomplete { .. } => "download_incomplete",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}
