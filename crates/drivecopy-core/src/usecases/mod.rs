//! Use cases (interactors) for drivecopy
//!
//! Use cases orchestrate domain types and port interfaces. They hold no
//! transport or archive logic of their own.
//!
//! ## Use Cases
//!
//! - [`TransferUseCase`] - Upload, replace and download of a single entry

pub mod cleanup;
pub mod transfer;

pub use cleanup::{delete_local_tree, DeletionReport};
pub use transfer::TransferUseCase;
