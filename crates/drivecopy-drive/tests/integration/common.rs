//! Shared helpers for Drive API integration tests
//!
//! Each helper mounts the mocks a scenario needs and returns a repository
//! pointing at the mock server.

use drivecopy_core::domain::RemoteId;
use drivecopy_core::ports::Credential;
use drivecopy_drive::backoff::BackoffExecutor;
use drivecopy_drive::client::DriveClient;
use drivecopy_drive::query::{entry_query, folder_query};
use drivecopy_drive::repository::DriveEntryRepository;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Starts a mock server and a repository that retries without delay
pub async fn setup_drive_mock() -> (MockServer, DriveEntryRepository) {
    let server = MockServer::start().await;
    let repository = DriveEntryRepository::new(
        DriveClient::with_base_url(server.uri()),
        BackoffExecutor::immediate(5),
    );
    (server, repository)
}

pub fn credential() -> Credential {
    Credential {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        access_token: "test-access-token".to_string(),
        refresh_token: "test-refresh-token".to_string(),
    }
}

pub fn id(value: &str) -> RemoteId {
    RemoteId::new(value.to_string()).unwrap()
}

pub fn folder(id: &str, title: &str) -> Value {
    json!({ "id": id, "title": title, "mimeType": FOLDER_MIME })
}

pub fn file(id: &str, title: &str, md5: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "mimeType": "text/plain",
        "md5Checksum": md5
    })
}

/// Mounts a `files.list` folder lookup answered with `items`, expected `times` times
pub async fn mount_folder_lookup(
    server: &MockServer,
    title: &str,
    parent: &RemoteId,
    items: Vec<Value>,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path("/drive/v2/files"))
        .and(query_param("q", folder_query(title, parent)))
        .and(query_param("maxResults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts a `files.list` entry lookup answered with `items`
pub async fn mount_entry_lookup(
    server: &MockServer,
    title: &str,
    parent: &RemoteId,
    items: Vec<Value>,
) {
    Mock::given(method("GET"))
        .and(path("/drive/v2/files"))
        .and(query_param("q", entry_query(title, parent)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

/// Error body in the shape the Drive API returns
pub fn api_error(status: u16, reason: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": {
            "errors": [{ "domain": "usageLimits", "reason": reason, "message": message }],
            "code": status,
            "message": message
        }
    }))
}
