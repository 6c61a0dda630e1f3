//! Folder chain resolution and entry lookup against a mocked Drive API

use drivecopy_core::domain::{RemoteId, TransferError};
use drivecopy_core::ports::IRemoteRepository;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, credential, file, folder, id};

fn segments(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Folder chain
// ============================================================================

#[tokio::test]
async fn test_existing_chain_issues_one_lookup_per_segment() {
    let (server, repository) = common::setup_drive_mock().await;
    let root = RemoteId::root();

    common::mount_folder_lookup(&server, "Reports", &root, vec![folder("f-reports", "Reports")], 1)
        .await;
    common::mount_folder_lookup(&server, "2024", &id("f-reports"), vec![folder("f-2024", "2024")], 1)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/v2/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolved = repository
        .resolve_folder_chain(&credential(), &segments(&["Reports", "2024"]), &root, true)
        .await
        .unwrap();

    assert_eq!(resolved, id("f-2024"));
}

#[tokio::test]
async fn test_empty_chain_is_root_without_requests() {
    let (server, repository) = common::setup_drive_mock().await;

    let resolved = repository
        .resolve_folder_chain(&credential(), &[], &RemoteId::root(), false)
        .await
        .unwrap();

    assert!(resolved.is_root());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_segment_fails_without_creating() {
    let (server, repository) = common::setup_drive_mock().await;
    let root = RemoteId::root();

    common::mount_folder_lookup(&server, "Reports", &root, vec![folder("f-reports", "Reports")], 1)
        .await;
    common::mount_folder_lookup(&server, "2024", &id("f-reports"), vec![], 1).await;
    Mock::given(method("POST"))
        .and(path("/drive/v2/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = repository
        .resolve_folder_chain(
            &credential(),
            &segments(&["Reports", "2024", "Q1"]),
            &root,
            false,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::FolderNotFound(ref name) if name == "2024"));
}

#[tokio::test]
async fn test_creates_exactly_one_folder_per_missing_segment() {
    let (server, repository) = common::setup_drive_mock().await;
    let root = RemoteId::root();

    common::mount_folder_lookup(&server, "Reports", &root, vec![folder("f-reports", "Reports")], 1)
        .await;
    common::mount_folder_lookup(&server, "2024", &id("f-reports"), vec![], 1).await;
    common::mount_folder_lookup(&server, "Q1", &id("f-2024"), vec![], 1).await;

    Mock::given(method("POST"))
        .and(path("/drive/v2/files"))
        .and(body_string_contains(r#""title":"2024""#))
        .and(body_string_contains(r#""parents":[{"id":"f-reports"}]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder("f-2024", "2024")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/v2/files"))
        .and(body_string_contains(r#""title":"Q1""#))
        .and(body_string_contains(common::FOLDER_MIME))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder("f-q1", "Q1")))
        .expect(1)
        .mount(&server)
        .await;

    let resolved = repository
        .resolve_folder_chain(&credential(), &segments(&["Reports", "2024", "Q1"]), &root, true)
        .await
        .unwrap();

    assert_eq!(resolved, id("f-q1"));
}

#[tokio::test]
async fn test_duplicate_folders_are_ambiguous() {
    let (server, repository) = common::setup_drive_mock().await;
    let root = RemoteId::root();

    common::mount_folder_lookup(
        &server,
        "Reports",
        &root,
        vec![folder("f-1", "Reports"), folder("f-2", "Reports")],
        1,
    )
    .await;

    let err = repository
        .resolve_folder_chain(&credential(), &segments(&["Reports"]), &root, true)
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::AmbiguousEntry(ref name) if name == "Reports"));
}

// ============================================================================
// Entry lookup
// ============================================================================

#[tokio::test]
async fn test_search_is_idempotent() {
    let (server, repository) = common::setup_drive_mock().await;
    let parent = id("f-reports");
    common::mount_entry_lookup(
        &server,
        "summary.txt",
        &parent,
        vec![file("e-1", "summary.txt", "5eb63bbbe01eeed093cb22bb8f5acdc3")],
    )
    .await;

    let first = repository
        .search(&credential(), "summary.txt", &parent)
        .await
        .unwrap();
    let second = repository
        .search(&credential(), "summary.txt", &parent)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.remote_id, Some(id("e-1")));
    assert_eq!(
        first.content_hash.unwrap().as_str(),
        "5eb63bbbe01eeed093cb22bb8f5acdc3"
    );
}

#[tokio::test]
async fn test_search_with_no_match_is_not_found() {
    let (server, repository) = common::setup_drive_mock().await;
    common::mount_entry_lookup(&server, "summary.txt", &RemoteId::root(), vec![]).await;

    let err = repository
        .search(&credential(), "summary.txt", &RemoteId::root())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_search_with_inexact_title_is_not_found() {
    let (server, repository) = common::setup_drive_mock().await;
    common::mount_entry_lookup(
        &server,
        "summary.txt",
        &RemoteId::root(),
        vec![file("e-1", "Summary.txt", "5eb63bbbe01eeed093cb22bb8f5acdc3")],
    )
    .await;

    let err = repository
        .search(&credential(), "summary.txt", &RemoteId::root())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::ItemNotFound(_)));
}

#[tokio::test]
async fn test_search_with_two_matches_is_ambiguous() {
    let (server, repository) = common::setup_drive_mock().await;
    common::mount_entry_lookup(
        &server,
        "summary.txt",
        &RemoteId::root(),
        vec![
            file("e-1", "summary.txt", "5eb63bbbe01eeed093cb22bb8f5acdc3"),
            file("e-2", "summary.txt", "5eb63bbbe01eeed093cb22bb8f5acdc3"),
        ],
    )
    .await;

    let err = repository
        .search(&credential(), "summary.txt", &RemoteId::root())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::AmbiguousEntry(_)));
}
