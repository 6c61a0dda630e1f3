//! Multipart upload bodies
//!
//! `files.insert` and `files.update` with `uploadType=multipart` take a
//! `multipart/related` body: a JSON metadata part followed by the content
//! part. The body is streamed in chunks so progress can be reported while
//! reqwest sends it.

use bytes::Bytes;
use drivecopy_core::ports::{ProgressFn, TransferProgress};
use serde::Serialize;

/// Size of the content chunks handed to the HTTP stack
pub const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// Reference to a parent folder in file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentReference {
    pub id: String,
}

/// Metadata part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ParentReference>,
}

/// A `multipart/related` request body
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    head: Bytes,
    content: Bytes,
    tail: Bytes,
}

impl MultipartBody {
    /// Builds the body for `metadata` and `content`, with a random boundary
    pub fn new(metadata: &FileMetadata, content: Bytes) -> serde_json::Result<Self> {
        let boundary = format!("drivecopy_{:016x}", rand::random::<u64>());
        Self::with_boundary(metadata, content, boundary)
    }

    fn with_boundary(
        metadata: &FileMetadata,
        content: Bytes,
        boundary: String,
    ) -> serde_json::Result<Self> {
        let json = serde_json::to_string(metadata)?;
        let head = format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{json}\r\n\
             --{boundary}\r\nContent-Type: {}\r\n\r\n",
            metadata.mime_type
        );
        let tail = format!("\r\n--{boundary}--\r\n");
        Ok(Self {
            boundary,
            head: Bytes::from(head),
            content,
            tail: Bytes::from(tail),
        })
    }

    /// Value for the `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }

    /// Total body length in bytes
    pub fn len(&self) -> u64 {
        (self.head.len() + self.content.len() + self.tail.len()) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the body into the chunks that will be sent
    fn chunks(&self) -> Vec<Bytes> {
        let mut chunks = vec![self.head.clone()];
        let mut offset = 0;
        while offset < self.content.len() {
            let end = (offset + UPLOAD_CHUNK_SIZE).min(self.content.len());
            chunks.push(self.content.slice(offset..end));
            offset = end;
        }
        chunks.push(self.tail.clone());
        chunks
    }

    /// Converts into a streaming request body reporting progress per chunk
    pub fn into_body(self, progress: Option<ProgressFn>) -> reqwest::Body {
        let total = self.len().max(1) as f64;
        let mut sent = 0u64;
        let chunks = self.chunks().into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(progress) = &progress {
                progress(TransferProgress::InProgress(sent as f64 / total));
            }
            Ok::<_, std::io::Error>(chunk)
        });
        reqwest::Body::wrap_stream(futures_util::stream::iter(chunks))
    }

    #[cfg(test)]
    fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::with_capacity(self.len() as usize);
        for chunk in self.chunks() {
            buf.extend_from_slice(&chunk);
        }
        Bytes::from(buf)
    }
}
