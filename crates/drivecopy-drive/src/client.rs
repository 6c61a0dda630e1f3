//! Google Drive v2 API client
//!
//! Provides a typed HTTP client for the `files` resource. Each method issues
//! exactly one request and classifies the outcome as a [`DriveError`];
//! retries are the caller's business (see [`crate::backoff`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivecopy_drive::client::DriveClient;
//!
//! # async fn example() -> Result<(), drivecopy_drive::DriveError> {
//! let client = DriveClient::new();
//! let items = client
//!     .list_files("access-token", "title = 'notes.txt'", 2)
//!     .await?;
//! println!("{} match(es)", items.len());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use bytes::Bytes;
use drivecopy_core::ports::{ProgressFn, TransferProgress};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::upload::{FileMetadata, MultipartBody, ParentReference};
use crate::DriveError;

/// Base URL for the Google APIs
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

const FILES_PATH: &str = "/drive/v2/files";
const UPLOAD_FILES_PATH: &str = "/upload/drive/v2/files";

// ============================================================================
// Drive API response types
// ============================================================================

/// A file or folder resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub mime_type: Option<String>,
    pub md5_checksum: Option<String>,
    pub download_url: Option<String>,
}

/// Response of `files.list`
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    items: Vec<DriveFile>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Drive v2 calls
///
/// The access token is passed per call since it belongs to the credential
/// the workflow obtained, not to the client.
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveClient {
    pub fn new() -> Self {
        Self::with_base_url(DRIVE_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for a path under the base URL
    pub fn request(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(access_token)
    }

    /// `files.list` with query `q`, returning at most `max_results` items
    pub async fn list_files(
        &self,
        access_token: &str,
        q: &str,
        max_results: u32,
    ) -> Result<Vec<DriveFile>, DriveError> {
        debug!(q, "files.list");
        let max_results = max_results.to_string();
        let response = self
            .request(Method::GET, FILES_PATH, access_token)
            .query(&[("q", q), ("maxResults", max_results.as_str())])
            .send()
            .await?;
        let list: FileList = parse_json(check_status(response).await?).await?;
        trace!(count = list.items.len(), "files.list returned");
        Ok(list.items)
    }

    /// `files.get` by id
    pub async fn get_file(&self, access_token: &str, id: &str) -> Result<DriveFile, DriveError> {
        debug!(id, "files.get");
        let response = self
            .request(Method::GET, &format!("{FILES_PATH}/{id}"), access_token)
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    /// Metadata-only `files.insert` of a folder under `parent_id`
    pub async fn insert_folder(
        &self,
        access_token: &str,
        title: &str,
        parent_id: &str,
    ) -> Result<DriveFile, DriveError> {
        debug!(title, parent_id, "files.insert (folder)");
        let metadata = FileMetadata {
            title: Some(title.to_string()),
            mime_type: drivecopy_core::domain::entry::FOLDER_MIME_TYPE.to_string(),
            parents: vec![ParentReference {
                id: parent_id.to_string(),
            }],
        };
        let response = self
            .request(Method::POST, FILES_PATH, access_token)
            .json(&metadata)
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    /// Multipart `files.insert` with content
    pub async fn insert_file(
        &self,
        access_token: &str,
        metadata: &FileMetadata,
        content: Bytes,
        progress: Option<ProgressFn>,
    ) -> Result<DriveFile, DriveError> {
        debug!(title = ?metadata.title, bytes = content.len(), "files.insert (multipart)");
        let builder = self
            .request(Method::POST, UPLOAD_FILES_PATH, access_token)
            .query(&[("uploadType", "multipart")]);
        self.send_multipart(builder, metadata, content, progress).await
    }

    /// Multipart `files.update` with content
    ///
    /// `new_revision = false` overwrites the head revision.
    pub async fn update_file(
        &self,
        access_token: &str,
        id: &str,
        metadata: &FileMetadata,
        content: Bytes,
        new_revision: bool,
        progress: Option<ProgressFn>,
    ) -> Result<DriveFile, DriveError> {
        debug!(id, new_revision, bytes = content.len(), "files.update (multipart)");
        let builder = self
            .request(Method::PUT, &format!("{UPLOAD_FILES_PATH}/{id}"), access_token)
            .query(&[
                ("uploadType", "multipart"),
                ("newRevision", if new_revision { "true" } else { "false" }),
            ]);
        self.send_multipart(builder, metadata, content, progress).await
    }

    async fn send_multipart(
        &self,
        builder: RequestBuilder,
        metadata: &FileMetadata,
        content: Bytes,
        progress: Option<ProgressFn>,
    ) -> Result<DriveFile, DriveError> {
        let body = MultipartBody::new(metadata, content)
            .map_err(|e| DriveError::InvalidResponse(format!("cannot encode metadata: {e}")))?;

        if let Some(progress) = &progress {
            progress(TransferProgress::NotStarted);
        }
        let response = builder
            .header(CONTENT_TYPE, body.content_type())
            .header(CONTENT_LENGTH, body.len())
            .body(body.into_body(progress.clone()))
            .send()
            .await?;
        let file = parse_json(check_status(response).await?).await?;
        if let Some(progress) = &progress {
            progress(TransferProgress::Complete);
        }
        Ok(file)
    }

    /// Streams the content at `url` into `target`, returning the byte count
    pub async fn download_to(
        &self,
        access_token: &str,
        url: &str,
        target: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<u64, DriveError> {
        debug!(target = %target.display(), "Downloading content");
        let local_io = |source| DriveError::LocalIo {
            path: target.to_path_buf(),
            source,
        };

        if let Some(progress) = &progress {
            progress(TransferProgress::NotStarted);
        }
        let response = self.client.get(url).bearer_auth(access_token).send().await?;
        let response = check_status(response).await?;
        let total = response.content_length();

        let mut file = tokio::fs::File::create(target).await.map_err(local_io)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(local_io)?;
            written += chunk.len() as u64;
            if let (Some(progress), Some(total)) = (&progress, total) {
                if total > 0 {
                    progress(TransferProgress::InProgress(written as f64 / total as f64));
                }
            }
        }
        file.flush().await.map_err(local_io)?;

        if let Some(progress) = &progress {
            progress(TransferProgress::Complete);
        }
        debug!(bytes = written, "Download complete");
        Ok(written)
    }
}

/// Turns non-success responses into [`DriveError::Api`]
async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let (reason, message) = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => (
            body.error.errors.into_iter().find_map(|e| e.reason),
            body.error.message,
        ),
        Err(_) => (None, text),
    };
    debug!(status = status.as_u16(), ?reason, "Drive API error");

    Err(DriveError::Api {
        status: status.as_u16(),
        reason,
        message,
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, DriveError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| DriveError::InvalidResponse(e.to_string()))
}
