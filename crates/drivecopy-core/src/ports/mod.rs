//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the transfer workflow depends on. Their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteRepository`] - Remote entry search, create, update, download
//! - [`ICredentialProvider`] - Access/refresh token pair plus client identity
//! - [`IDirectoryArchiver`] - Directory compression and decompression

pub mod archiver;
pub mod credential_provider;
pub mod remote_repository;

pub use archiver::{DirectoryTransferResult, IDirectoryArchiver};
pub use credential_provider::{Credential, ICredentialProvider, Tokens};
pub use remote_repository::{IRemoteRepository, ProgressFn, TransferProgress};
