//! Directory archiver port (driven/secondary port)
//!
//! Compresses a directory tree into a single archive file and expands such
//! an archive back into a directory. Operations are synchronous local
//! filesystem work; they are never routed through remote backoff.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Outcome of compressing a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTransferResult {
    /// Archive produced by `compress`
    pub archive_file_path: PathBuf,
    /// Level the archive was written with
    pub compression_level: u32,
    /// Files that could not be read and are absent from the archive
    pub excluded_files: BTreeSet<PathBuf>,
}

/// Port for directory compression
pub trait IDirectoryArchiver: Send + Sync {
    /// Writes every readable file under `source` into `archive`
    ///
    /// Unreadable files are skipped and reported in
    /// [`DirectoryTransferResult::excluded_files`].
    fn compress(
        &self,
        source: &Path,
        archive: &Path,
        level: u32,
    ) -> anyhow::Result<DirectoryTransferResult>;

    /// Expands `archive` under `destination`, creating directories as needed
    ///
    /// Files that already exist at the destination are skipped with a warning.
    fn decompress(&self, archive: &Path, destination: &Path) -> anyhow::Result<()>;
}
