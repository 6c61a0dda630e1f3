//! Local source deletion after a successful upload or replace
//!
//! Walks the source tree depth-first, deleting children before their
//! directory. Paths the archiver could not include, and paths that are not
//! both readable and writable, are left in place with a warning. Failures
//! never abort the walk.

use std::collections::BTreeSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Counts of what a deletion pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Files and directories removed
    pub deleted: usize,
    /// Paths left in place (excluded, inaccessible, or removal failed)
    pub kept: usize,
}

/// Deletes `path` and everything below it, except `excluded` paths
pub fn delete_local_tree(path: &Path, excluded: &BTreeSet<PathBuf>) -> DeletionReport {
    let mut report = DeletionReport::default();
    delete_recursive(path, excluded, &mut report);
    report
}

fn delete_recursive(path: &Path, excluded: &BTreeSet<PathBuf>, report: &mut DeletionReport) {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "File not deleted");
            report.kept += 1;
            return;
        }
    };

    if excluded.contains(path) || !is_accessible(path, &metadata) {
        warn!(path = %path.display(), "File not deleted");
        report.kept += 1;
        return;
    }

    let result = if metadata.is_dir() {
        debug!(path = %path.display(), "Processing directory for deletion");
        match fs::read_dir(path) {
            Ok(children) => {
                for child in children.flatten() {
                    delete_recursive(&child.path(), excluded, report);
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to list directory"),
        }
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => {
            debug!(path = %path.display(), "Deleted");
            report.deleted += 1;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to delete");
            report.kept += 1;
        }
    }
}

fn is_accessible(path: &Path, metadata: &Metadata) -> bool {
    if metadata.file_type().is_symlink() {
        return true;
    }
    if metadata.permissions().readonly() {
        return false;
    }
    if metadata.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}
