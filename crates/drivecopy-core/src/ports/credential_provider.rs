//! Credential provider port (driven/secondary port)
//!
//! Supplies the OAuth2 client identity and token pair used for every remote
//! call. Returns `anyhow::Result` since failures (not configured, not
//! authorized, refresh rejected) are adapter-specific; the workflow maps
//! them to `TransferError::Credential`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens received from the authorization server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for obtaining new access tokens (requires offline access)
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Client identity plus token pair handed to the remote repository
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    /// Checks that both tokens are present
    ///
    /// # Errors
    /// Returns error naming the missing token
    pub fn ensure_usable(&self) -> anyhow::Result<()> {
        if self.access_token.is_empty() {
            anyhow::bail!("access token is empty");
        }
        if self.refresh_token.is_empty() {
            anyhow::bail!("refresh token is empty");
        }
        Ok(())
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Port for obtaining usable credentials
#[async_trait::async_trait]
pub trait ICredentialProvider: Send + Sync {
    /// Returns a credential with a non-expired access token
    ///
    /// # Errors
    /// Fails if no tokens are stored, the client is not configured, or a
    /// token refresh is rejected
    async fn get_credential(&self) -> anyhow::Result<Credential>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(access: &str, refresh: &str) -> Credential {
        Credential {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[test]
    fn test_ensure_usable() {
        assert!(credential("a", "r").ensure_usable().is_ok());
        assert!(credential("", "r").ensure_usable().is_err());
        assert!(credential("a", "").ensure_usable().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", credential("access-123", "refresh-456"));
        assert!(debug.contains("client"));
        assert!(!debug.contains("access-123"));
        assert!(!debug.contains("refresh-456"));
        assert!(!debug.contains("secret\""));
    }

    #[test]
    fn test_tokens_expiry() {
        let tokens = Tokens {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::minutes(2),
        };
        assert!(!tokens.is_expired());
        assert!(tokens.expires_within(chrono::Duration::minutes(5)));
        assert!(!tokens.expires_within(chrono::Duration::seconds(10)));
    }
}
