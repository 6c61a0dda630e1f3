//! Retry behavior of repository calls against failing endpoints

use drivecopy_core::domain::{RemoteId, TransferError};
use drivecopy_core::ports::IRemoteRepository;
use drivecopy_drive::DriveError;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, credential, file};

#[tokio::test]
async fn test_unavailable_service_exhausts_attempts() {
    let (server, repository) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v2/files"))
        .respond_with(common::api_error(503, "backendError", "Backend Error"))
        .expect(5)
        .mount(&server)
        .await;

    let err = repository
        .search(&credential(), "notes.txt", &RemoteId::root())
        .await
        .unwrap_err();

    let TransferError::Transport(source) = err else {
        panic!("expected transport failure, got {err:?}");
    };
    let drive = source.downcast_ref::<DriveError>().unwrap();
    assert!(matches!(
        drive,
        DriveError::RetriesExhausted { attempts: 5, .. }
    ));
}

#[tokio::test]
async fn test_rate_limited_request_recovers() {
    let (server, repository) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v2/files"))
        .respond_with(common::api_error(
            403,
            "userRateLimitExceeded",
            "User Rate Limit Exceeded",
        ))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v2/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [file("e-1", "notes.txt", "5eb63bbbe01eeed093cb22bb8f5acdc3")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = repository
        .search(&credential(), "notes.txt", &RemoteId::root())
        .await
        .unwrap();
    assert_eq!(entry.remote_id, Some(common::id("e-1")));
}

#[tokio::test]
async fn test_permission_error_is_not_retried() {
    let (server, repository) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v2/files"))
        .respond_with(common::api_error(
            403,
            "insufficientPermissions",
            "Insufficient Permission",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = repository
        .search(&credential(), "notes.txt", &RemoteId::root())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Transport(_)));
    assert!(err.to_string().contains("Insufficient Permission"));
}
