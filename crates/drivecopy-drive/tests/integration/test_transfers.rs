//! Create, update and download against a mocked Drive API

use std::sync::{Arc, Mutex};

use drivecopy_core::domain::{compute_file_hash, RemoteEntry, TransferError};
use drivecopy_core::ports::{IRemoteRepository, ProgressFn, TransferProgress};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, credential, id};

fn recorder() -> (ProgressFn, Arc<Mutex<Vec<TransferProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressFn = Arc::new(move |p: TransferProgress| sink.lock().unwrap().push(p));
    (progress, seen)
}

// ============================================================================
// Upload tests
// ============================================================================

#[tokio::test]
async fn test_create_uploads_multipart_under_parent() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("hello.txt");
    std::fs::write(&local, "hello world").unwrap();

    Mock::given(method("POST"))
        .and(path("/upload/drive/v2/files"))
        .and(query_param("uploadType", "multipart"))
        .and(header("Authorization", "Bearer test-access-token"))
        .and(body_string_contains(r#""title":"hello.txt""#))
        .and(body_string_contains(r#""parents":[{"id":"f-docs"}]"#))
        .and(body_string_contains("Content-Type: text/plain\r\n\r\nhello world\r\n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e-new",
            "title": "hello.txt",
            "mimeType": "text/plain",
            "md5Checksum": "5eb63bbbe01eeed093cb22bb8f5acdc3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (progress, seen) = recorder();
    let entry = RemoteEntry::new("hello.txt")
        .with_local_file(&local)
        .with_mime_type("text/plain");
    let created = repository
        .create(&credential(), &entry, &id("f-docs"), Some(progress))
        .await
        .unwrap();

    assert_eq!(created.remote_id, Some(id("e-new")));
    assert_eq!(created.content_hash, Some(compute_file_hash(&local).unwrap()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&TransferProgress::NotStarted));
    assert_eq!(seen.last(), Some(&TransferProgress::Complete));
}

#[tokio::test]
async fn test_create_with_missing_local_file_is_local_io() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();

    let entry = RemoteEntry::new("gone.txt").with_local_file(dir.path().join("gone.txt"));
    let err = repository
        .create(&credential(), &entry, &id("f-docs"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::LocalIo { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_without_new_revision_when_skipping() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("report.bin");
    std::fs::write(&local, b"second version").unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v2/files/e-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e-1",
            "title": "report.bin",
            "mimeType": "application/octet-stream",
            "md5Checksum": "00000000000000000000000000000000"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/drive/v2/files/e-1"))
        .and(query_param("uploadType", "multipart"))
        .and(query_param("newRevision", "false"))
        .and(body_string_contains("second version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e-1",
            "title": "report.bin",
            "mimeType": "application/octet-stream",
            "md5Checksum": "4f1ad3b3fbdb5da0e5cc2dc0e2b1a5c3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut entry = RemoteEntry::new("report.bin").with_local_file(&local);
    entry.remote_id = Some(id("e-1"));
    entry.skip_revision = true;

    let updated = repository.update(&credential(), &entry, None).await.unwrap();
    assert_eq!(
        updated.content_hash.unwrap().as_str(),
        "4f1ad3b3fbdb5da0e5cc2dc0e2b1a5c3"
    );
}

#[tokio::test]
async fn test_update_adds_revision_by_default() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("report.bin");
    std::fs::write(&local, b"v2").unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v2/files/e-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "e-1", "title": "report.bin" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/drive/v2/files/e-1"))
        .and(query_param("newRevision", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "e-1", "title": "report.bin" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut entry = RemoteEntry::new("report.bin").with_local_file(&local);
    entry.remote_id = Some(id("e-1"));

    repository.update(&credential(), &entry, None).await.unwrap();
}

#[tokio::test]
async fn test_update_of_deleted_entry_is_not_found() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("report.bin");
    std::fs::write(&local, b"v2").unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v2/files/e-1"))
        .respond_with(common::api_error(404, "notFound", "File not found: e-1"))
        .mount(&server)
        .await;

    let mut entry = RemoteEntry::new("report.bin").with_local_file(&local);
    entry.remote_id = Some(id("e-1"));

    let err = repository.update(&credential(), &entry, None).await.unwrap_err();
    assert!(matches!(err, TransferError::ItemNotFound(ref name) if name == "report.bin"));
}

// ============================================================================
// Download tests
// ============================================================================

#[tokio::test]
async fn test_download_writes_content_and_records_checksum() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("hello.txt");

    Mock::given(method("GET"))
        .and(path("/drive/v2/files/e-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e-1",
            "title": "hello.txt",
            "mimeType": "text/plain",
            "md5Checksum": "5eb63bbbe01eeed093cb22bb8f5acdc3",
            "downloadUrl": format!("{}/content/e-1", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/e-1"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (progress, seen) = recorder();
    let mut entry = RemoteEntry::new("hello.txt").with_local_file(&target);
    entry.remote_id = Some(id("e-1"));

    let downloaded = repository
        .download(&credential(), &entry, Some(progress))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"hello world");
    assert_eq!(downloaded.content_hash, Some(compute_file_hash(&target).unwrap()));
    assert_eq!(seen.lock().unwrap().last(), Some(&TransferProgress::Complete));
}

#[tokio::test]
async fn test_download_without_content_url_is_not_found() {
    let (server, repository) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v2/files/e-doc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e-doc",
            "title": "Native document",
            "mimeType": "application/vnd.google-apps.document"
        })))
        .mount(&server)
        .await;

    let mut entry =
        RemoteEntry::new("Native document").with_local_file(dir.path().join("doc"));
    entry.remote_id = Some(id("e-doc"));

    let err = repository.download(&credential(), &entry, None).await.unwrap_err();
    assert!(matches!(err, TransferError::ItemNotFound(_)));
    assert!(!dir.path().join("doc").exists());
}
