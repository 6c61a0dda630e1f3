//! Token refresh against a mocked OAuth2 token endpoint

use std::sync::Arc;

use chrono::{Duration, Utc};
use drivecopy_core::ports::{ICredentialProvider, Tokens};
use drivecopy_drive::auth::{FileTokenStorage, OAuth2Config, OAuthCredentialProvider, TokenStorage};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn expired_tokens() -> Tokens {
    Tokens {
        access_token: "stale-access".to_string(),
        refresh_token: Some("long-lived-refresh".to_string()),
        expires_at: Utc::now() - Duration::minutes(1),
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=long-lived-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileTokenStorage::new(dir.path().join("tokens.json")));
    storage.store(&expired_tokens()).unwrap();

    let config = OAuth2Config::new("client-id", "client-secret")
        .with_token_url(format!("{}/token", server.uri()));
    let provider = OAuthCredentialProvider::new(config, storage.clone());

    let credential = provider.get_credential().await.unwrap();
    assert_eq!(credential.access_token, "fresh-access");
    assert_eq!(credential.refresh_token, "long-lived-refresh");

    let persisted = storage.load().unwrap().unwrap();
    assert_eq!(persisted.access_token, "fresh-access");
    assert_eq!(persisted.refresh_token.as_deref(), Some("long-lived-refresh"));
    assert!(!persisted.is_expired());

    // Cached and valid now: no second refresh (the mock expects one call).
    let again = provider.get_credential().await.unwrap();
    assert_eq!(again.access_token, "fresh-access");
}

#[tokio::test]
async fn test_rejected_refresh_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileTokenStorage::new(dir.path().join("tokens.json")));
    storage.store(&expired_tokens()).unwrap();

    let config = OAuth2Config::new("client-id", "client-secret")
        .with_token_url(format!("{}/token", server.uri()));
    let provider = OAuthCredentialProvider::new(config, storage.clone());

    let err = provider.get_credential().await.unwrap_err();
    assert!(format!("{err:#}").contains("refresh"));
    assert_eq!(storage.load().unwrap().unwrap().access_token, "stale-access");
}
