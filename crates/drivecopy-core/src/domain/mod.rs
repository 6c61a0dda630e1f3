//! Domain entities and business rules
//!
//! This module contains the core domain types for drivecopy:
//! - Newtypes for remote identifiers, content hashes and entry paths
//! - Remote entry records and transfer requests
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod hash;
pub mod newtypes;
pub mod request;

// Re-export commonly used types
pub use entry::RemoteEntry;
pub use errors::{DomainError, TransferError};
pub use hash::compute_file_hash;
pub use newtypes::*;
pub use request::{TransferAction, TransferOutcome, TransferRequest};
