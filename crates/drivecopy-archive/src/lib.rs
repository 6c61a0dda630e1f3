//! drivecopy Archive - Directory compression
//!
//! Implements the `IDirectoryArchiver` port with zip containers, so a whole
//! directory tree can travel as a single remote entry.
//!
//! ## Modules
//!
//! - [`zip_archiver`] - [`ZipArchiver`], deflate/stored zip compression

pub mod zip_archiver;

pub use zip_archiver::ZipArchiver;
