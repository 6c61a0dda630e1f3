//! Newtype wrappers for type-safe domain values
//!
//! - [`RemoteId`] - Drive object identifier (with the `root` sentinel)
//! - [`ContentHash`] - Hexadecimal MD5 digest, compared case-insensitively
//! - [`EntryPath`] - Remote entry name split into folder chain and leaf

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Separator between folder segments in a remote entry name
pub const PATH_SEPARATOR: char = '/';

// ============================================================================
// RemoteId
// ============================================================================

/// Drive object identifier
///
/// Format: non-empty string of alphanumerics, `-` and `_`
/// (e.g. "0B8x3kQvJYxQ3c1RZd2hEX3hqc0U").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Well-known id of the drive's root folder
    pub const ROOT: &'static str = "root";

    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains invalid characters
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// The root folder sentinel
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Returns true for the root folder sentinel
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// ContentHash
// ============================================================================

/// MD5 content digest in hexadecimal form
///
/// The remote service reports `md5Checksum` in lowercase hex; equality is
/// case-insensitive so values from any source compare correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Create a new ContentHash, normalizing to lowercase
    ///
    /// # Errors
    /// Returns error unless the value is 32 hexadecimal characters
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.len() != 32 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(hash));
        }
        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ContentHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ContentHash {}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

// ============================================================================
// EntryPath
// ============================================================================

/// A remote entry name split into its folder chain and leaf name
///
/// `"A/B/notes.txt"` resolves to folders `["A", "B"]` and name `"notes.txt"`.
/// Empty segments produced by leading, trailing or doubled separators are
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPath {
    folders: Vec<String>,
    name: String,
}

impl EntryPath {
    /// Parse a remote entry name
    ///
    /// # Errors
    /// Returns error if no non-empty segment remains
    pub fn parse(remote_name: &str) -> Result<Self, DomainError> {
        let mut segments: Vec<String> = remote_name
            .split(PATH_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let name = segments
            .pop()
            .ok_or_else(|| DomainError::InvalidRemotePath(remote_name.to_string()))?;

        Ok(Self {
            folders: segments,
            name,
        })
    }

    /// Folder chain to resolve, outermost first
    #[must_use]
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Leaf entry name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for EntryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for folder in &self.folders {
            write!(f, "{folder}{PATH_SEPARATOR}")?;
        }
        write!(f, "{}", self.name)
    }
}

impl FromStr for EntryPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
