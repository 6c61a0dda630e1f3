//! drivecopy Drive - Google Drive v2 adapter
//!
//! Provides:
//! - A typed HTTP client for the Drive v2 `files` resource
//! - The exponential backoff policy wrapped around every remote call
//! - [`repository::DriveEntryRepository`], the `IRemoteRepository` adapter
//! - OAuth2 login, token storage and the `ICredentialProvider` adapter
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 authorization code flow, token storage, credential provider
//! - [`backoff`] - Retry policy for transient service failures
//! - [`client`] - Drive v2 HTTP client
//! - [`query`] - Search query construction
//! - [`repository`] - Folder chain resolution and entry operations
//! - [`upload`] - Multipart upload bodies and progress reporting

pub mod auth;
pub mod backoff;
pub mod client;
pub mod query;
pub mod repository;
pub mod upload;

use std::path::PathBuf;

use drivecopy_core::domain::TransferError;
use thiserror::Error;

/// Error reasons the service reports for throttled requests
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// First `reason` of the error body, if any
        reason: Option<String>,
        /// Error message from the body, or the raw body
        message: String,
    },

    /// Every attempt failed with a transient error
    #[error("Request never succeeded after {attempts} attempts: {operation}")]
    RetriesExhausted {
        /// Logical operation name
        operation: String,
        /// Number of attempts made
        attempts: u32,
        /// Error returned by the last attempt
        #[source]
        last: Box<DriveError>,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Reading the upload source or writing the download target failed
    #[error("Local I/O failure on '{path}': {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DriveError {
    /// Returns true for failures worth retrying
    ///
    /// HTTP 500, HTTP 503, and HTTP 403 carrying a rate limit reason.
    pub fn is_transient(&self) -> bool {
        match self {
            DriveError::Api { status, reason, .. } => match status {
                500 | 503 => true,
                403 => reason
                    .as_deref()
                    .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r)),
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns the HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            DriveError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DriveError> for TransferError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::LocalIo { path, source } => TransferError::LocalIo { path, source },
            other => TransferError::Transport(anyhow::Error::new(other)),
        }
    }
}
