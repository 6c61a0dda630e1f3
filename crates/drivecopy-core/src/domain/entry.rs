//! RemoteEntry domain entity
//!
//! A `RemoteEntry` is the workflow's view of a single remote file: its id
//! (once created or found), title, content type and the MD5 digest the
//! service reports. The same record carries the local file that is the
//! source of an upload or the target of a download.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, RemoteId};

/// Default content type for plain file uploads
pub const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

/// Default content type for compressed directory uploads
pub const DEFAULT_ARCHIVE_MIME_TYPE: &str = "application/zip";

/// Content type the remote service uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A single remote file-like object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Remote identifier, absent until the entry is created or found
    pub remote_id: Option<RemoteId>,
    /// Title of the entry within its parent folder
    pub name: String,
    /// Local file backing the entry (upload source or download target)
    pub local_file_path: Option<PathBuf>,
    /// Content type sent on create/update or reported by the service
    pub mime_type: Option<String>,
    /// MD5 digest reported by the remote service
    pub content_hash: Option<ContentHash>,
    /// When true, an update overwrites the head revision instead of adding one
    pub skip_revision: bool,
}

impl RemoteEntry {
    /// Creates a fresh entry record that does not exist remotely yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with the given local file attached
    #[must_use]
    pub fn with_local_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_file_path = Some(path.into());
        self
    }

    /// Returns a copy with the given content type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns true once the entry has a remote identifier
    pub fn exists_remotely(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Local file path, if one is attached
    pub fn local_file(&self) -> Option<&Path> {
        self.local_file_path.as_deref()
    }

    /// Sets the content type unless one is already present
    pub fn default_mime_type(&mut self, mime_type: &str) {
        if self.mime_type.is_none() {
            self.mime_type = Some(mime_type.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_has_no_remote_state() {
        let entry = RemoteEntry::new("notes.txt");
        assert_eq!(entry.name, "notes.txt");
        assert!(!entry.exists_remotely());
        assert!(entry.content_hash.is_none());
        assert!(entry.local_file().is_none());
        assert!(!entry.skip_revision);
    }

    #[test]
    fn test_default_mime_type_keeps_override() {
        let mut entry = RemoteEntry::new("a.csv").with_mime_type("text/csv");
        entry.default_mime_type(DEFAULT_FILE_MIME_TYPE);
        assert_eq!(entry.mime_type.as_deref(), Some("text/csv"));

        let mut entry = RemoteEntry::new("a.bin");
        entry.default_mime_type(DEFAULT_FILE_MIME_TYPE);
        assert_eq!(entry.mime_type.as_deref(), Some(DEFAULT_FILE_MIME_TYPE));
    }

    #[test]
    fn test_with_local_file() {
        let entry = RemoteEntry::new("a.bin").with_local_file("/tmp/a.bin");
        assert_eq!(entry.local_file(), Some(Path::new("/tmp/a.bin")));
    }
}
