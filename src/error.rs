//! Error types for the npm release pipeline.
//!
//! Every stage of a release run has its own failure mode. Module-level errors
//! (`ManifestError`, `DownloadError`, `ExtractionError`, `RunLogError`) are
//! aggregated here so a run fails with a single [`ReleaseError`] whose message
//! is shown to the operator verbatim.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::manifest::ManifestError;
use crate::run_log::RunLogError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Usage line printed when the version argument is missing.
pub const USAGE: &str = "Usage: xsql-npm-publish <version> [--dry-run]";

/// Example invocation printed alongside [`USAGE`].
pub const USAGE_EXAMPLE: &str = "Example: xsql-npm-publish 1.2.3";

/// Errors that abort a release run.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// A required command-line argument was missing.
    #[error("{message}")]
    Usage {
        /// Guidance shown to the operator.
        message: String,
    },

    /// The release version argument is malformed.
    #[error("invalid version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected argument.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The platform matrix is empty or maps targets ambiguously.
    #[error("invalid platform matrix: {reason}")]
    InvalidMatrix {
        /// Description of the validation failure.
        reason: String,
    },

    /// A package manifest could not be synchronized.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A release archive could not be downloaded.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A binary could not be extracted from its archive.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// `npm publish` failed for a package.
    #[error("npm publish failed for {package}: {reason}")]
    Publish {
        /// Registry name of the package.
        package: String,
        /// Exit status and captured stderr.
        reason: String,
    },

    /// The staging area could not be created or removed.
    #[error("staging area {path}: {source}")]
    Staging {
        /// Path to the staging directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The resumable run log could not be read or written.
    #[error(transparent)]
    RunLog(#[from] RunLogError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl ReleaseError {
    /// Build the usage error shown when no version argument is given.
    #[must_use]
    pub fn missing_version() -> Self {
        Self::Usage {
            message: format!("{USAGE}\n{USAGE_EXAMPLE}"),
        }
    }
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;
