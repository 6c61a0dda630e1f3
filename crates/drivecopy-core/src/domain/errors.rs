//! Domain error types
//!
//! [`DomainError`] covers validation of domain values (paths, ids, hashes,
//! request options). [`TransferError`] is the single workflow-level error:
//! every adapter failure is converted into one of its variants before it
//! reaches the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote entry path (empty or only separators)
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid hash format (expected hexadecimal MD5)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Compression level outside of 0..=9
    #[error("Invalid compression level {0}: must be between 0 and 9")]
    InvalidCompressionLevel(u32),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors surfaced by a transfer workflow invocation
///
/// `ItemNotFound` and `FolderNotFound` are recoverable by workflow branches
/// (force / create-folder handling); every other variant terminates the
/// invocation.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No matching remote entry
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// A folder of the chain does not exist remotely
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// More than one remote result for a query expected to be unique
    #[error("Ambiguous entry: {0}")]
    AmbiguousEntry(String),

    /// Upload target already present
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// Network or service failure after backoff, or a non-retriable status
    #[error("Transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// Content hash mismatch after a transfer
    #[error("Content hash mismatch for '{path}': local={local}, remote={remote}")]
    Integrity {
        /// File whose hash was verified
        path: PathBuf,
        /// Hash computed from the local bytes
        local: String,
        /// Hash reported by the remote service
        remote: String,
    },

    /// Filesystem failure on the transfer path
    #[error("Local I/O failure on '{path}': {source}")]
    LocalIo {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Archiver failure while compressing or decompressing a directory
    #[error("Archive failure: {0:#}")]
    Archive(#[source] anyhow::Error),

    /// Credential provider not configured, not authorized, or refresh failed
    #[error("Credential unavailable: {0:#}")]
    Credential(#[source] anyhow::Error),

    /// The request failed domain validation
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),
}

impl TransferError {
    /// Builds a [`TransferError::LocalIo`] for `path`
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Returns true for the not-found family the workflow may recover from
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound(_) | Self::FolderNotFound(_))
    }
}
