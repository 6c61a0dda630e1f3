//! Search query construction for `files.list`
//!
//! Drive's `q` parameter is a small expression language. String literals are
//! single-quoted; `\` and `'` inside them must be escaped with a backslash.

use drivecopy_core::domain::entry::FOLDER_MIME_TYPE;
use drivecopy_core::domain::RemoteId;

/// Escapes a value for use inside a single-quoted query literal
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Query for a non-trashed folder titled `title` directly under `parent`
pub fn folder_query(title: &str, parent: &RemoteId) -> String {
    format!(
        "title = '{}' and trashed = false and mimeType = '{}' and '{}' in parents",
        escape_literal(title),
        FOLDER_MIME_TYPE,
        escape_literal(parent.as_str())
    )
}

/// Query for a non-trashed, non-folder entry titled `title` directly under `parent`
pub fn entry_query(title: &str, parent: &RemoteId) -> String {
    format!(
        "title = '{}' and trashed = false and mimeType != '{}' and '{}' in parents",
        escape_literal(title),
        FOLDER_MIME_TYPE,
        escape_literal(parent.as_str())
    )
}
