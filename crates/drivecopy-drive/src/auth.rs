//! OAuth2 authentication for Google Drive
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) and a loopback
//! redirect, as recommended for installed applications.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client identity, endpoints and scopes
//! - [`TokenStorage`] - Where tokens live between runs ([`KeyringTokenStorage`]
//!   or [`FileTokenStorage`])
//! - [`PKCEFlow`] - Authorization URL generation, code exchange and refresh
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`DriveAuthAdapter`] - Orchestrates the interactive login
//! - [`OAuthCredentialProvider`] - `ICredentialProvider` backed by stored tokens

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use drivecopy_core::config::AuthConfig;
use drivecopy_core::ports::{Credential, ICredentialProvider, Tokens};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse,
    TokenUrl,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Google OAuth2 authorization endpoint
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth2 token endpoint
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Full read/write access to the user's Drive
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Default loopback port for the redirect
pub const DEFAULT_REDIRECT_PORT: u16 = 8400;

/// Path the redirect is sent to
const CALLBACK_PATH: &str = "/callback";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "drivecopy";

/// Keyring username when none is configured
const KEYRING_USER: &str = "default";

/// How long the login waits for the browser redirect
const LOGIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Refresh tokens that expire within this margin
const REFRESH_MARGIN_SECS: i64 = 60;

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 flow
#[derive(Clone)]
pub struct OAuth2Config {
    /// Client ID from the Google Cloud console
    pub client_id: String,
    /// Client secret issued with the client ID
    pub client_secret: String,
    /// Loopback port for receiving the authorization code
    pub redirect_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a config with the Google endpoints and the Drive scope
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            scopes: vec![DRIVE_SCOPE.to_string()],
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Builds the OAuth config from the `auth` config section
    ///
    /// # Errors
    /// Fails if the client ID or secret is not configured
    pub fn from_auth_config(config: &AuthConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .context("auth.client_id is not configured")?;
        let client_secret = config
            .client_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .context("auth.client_secret is not configured")?;
        Ok(Self::new(client_id, client_secret).with_redirect_port(config.redirect_port))
    }

    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Overrides the token endpoint
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Redirect URI registered for the loopback server
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.redirect_port, CALLBACK_PATH)
    }
}

impl std::fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_port", &self.redirect_port)
            .field("scopes", &self.scopes)
            .finish()
    }
}

// ============================================================================
// Token storage
// ============================================================================

/// Persistent store for OAuth tokens
pub trait TokenStorage: Send + Sync {
    fn store(&self, tokens: &Tokens) -> Result<()>;

    /// Returns `None` when nothing is stored
    fn load(&self) -> Result<Option<Tokens>>;

    /// Removes stored tokens; succeeds when there is nothing to remove
    fn clear(&self) -> Result<()>;

    /// Human readable location, for status output
    fn location(&self) -> String;
}

/// Stores tokens in the system keyring
///
/// Tokens are serialized as JSON under the service name "drivecopy".
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    username: String,
}

impl KeyringTokenStorage {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.username)
            .context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new(KEYRING_USER)
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn store(&self, tokens: &Tokens) -> Result<()> {
        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;
        debug!(user = %self.username, "Stored tokens in keyring");
        Ok(())
    }

    fn load(&self) -> Result<Option<Tokens>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(user = %self.username, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!(user = %self.username, "Cleared tokens from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }

    fn location(&self) -> String {
        format!("keyring ({}/{})", KEYRING_SERVICE, self.username)
    }
}

/// Stores tokens in a JSON file, for hosts without a secret service
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn store(&self, tokens: &Tokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", self.path.display()))?;
        }

        debug!(path = %self.path.display(), "Stored tokens in file");
        Ok(())
    }

    fn load(&self) -> Result<Option<Tokens>> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .with_context(|| format!("Failed to parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(anyhow::Error::new(e).context(format!("Failed to read {}", self.path.display())))
            }
        }
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed token file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove {}", self.path.display()))),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Picks the token store named by `auth.token_store`
///
/// # Errors
/// Fails for an unknown store name
pub fn token_storage_from_config(config: &AuthConfig) -> Result<Arc<dyn TokenStorage>> {
    match config.token_store.as_str() {
        "keyring" => Ok(Arc::new(KeyringTokenStorage::default())),
        "file" => Ok(Arc::new(FileTokenStorage::new(config.token_file.clone()))),
        other => bail!("unknown token store '{other}', expected 'keyring' or 'file'"),
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::Client,
    scopes: Vec<String>,
}

impl PKCEFlow {
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri()).context("Invalid redirect URI")?,
            );

        // The token endpoint must not be followed across redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            http,
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access so a refresh token is issued, and forces the
    /// consent screen so it is issued again on re-login.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();
        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .context("Failed to exchange authorization code")?;
        Ok(tokens_from_response(&response, None))
    }

    /// Obtains a fresh access token; keeps `refresh_token` if none is returned
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .context("Failed to refresh token")?;
        Ok(tokens_from_response(&response, Some(refresh_token)))
    }
}

fn tokens_from_response(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> Tokens {
    let expires_at = response
        .expires_in()
        .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
        .unwrap_or_else(|| Utc::now() + Duration::hours(1));

    Tokens {
        access_token: response.access_token().secret().to_string(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at,
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

/// What the redirect carried
#[derive(Debug, PartialEq, Eq)]
enum Callback {
    Authorized(CallbackParams),
    Denied(String),
    Unrelated,
}

/// Loopback HTTP server receiving the OAuth2 redirect
///
/// Bound before the browser is opened, so the redirect cannot arrive before
/// anyone is listening.
pub struct LocalCallbackServer {
    listener: TcpListener,
}

impl LocalCallbackServer {
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;
        info!(%addr, "OAuth callback server listening");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Callback server has no local address")
    }

    /// Serves connections until a request carrying `code` or `error` arrives
    pub async fn wait_for_callback(self) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::header::{HeaderValue, CONTENT_TYPE};
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::sync::mpsc;

        let (tx, mut rx) = mpsc::channel::<std::result::Result<CallbackParams, String>>(1);

        loop {
            let stream = tokio::select! {
                received = rx.recv() => {
                    return match received {
                        Some(Ok(params)) => {
                            info!("Received OAuth callback with authorization code");
                            Ok(params)
                        }
                        Some(Err(reason)) => bail!("Authorization was denied: {reason}"),
                        None => bail!("Callback server stopped without receiving a code"),
                    };
                }
                accepted = self.listener.accept() => {
                    let (stream, _) = accepted.context("Failed to accept callback connection")?;
                    stream
                }
            };

            let tx = tx.clone();
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let tx = tx.clone();
                async move {
                    let uri = req.uri().to_string();
                    debug!(%uri, "Callback server received request");

                    let (status, html) = match parse_callback(&uri) {
                        Callback::Authorized(params) => {
                            let _ = tx.send(Ok(params)).await;
                            (StatusCode::OK, success_html())
                        }
                        Callback::Denied(reason) => {
                            let html = error_html(&reason);
                            let _ = tx.send(Err(reason)).await;
                            (StatusCode::BAD_REQUEST, html)
                        }
                        Callback::Unrelated => (StatusCode::NOT_FOUND, error_html("Not found")),
                    };

                    let mut response = Response::new(Full::new(Bytes::from(html)));
                    *response.status_mut() = status;
                    response.headers_mut().insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("text/html; charset=utf-8"),
                    );
                    Ok::<_, hyper::Error>(response)
                }
            });

            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    warn!(error = %e, "Callback server connection error");
                }
            });
        }
    }
}

fn parse_callback(uri: &str) -> Callback {
    let Ok(url) = url::Url::parse(&format!("http://localhost{uri}")) else {
        return Callback::Unrelated;
    };
    if url.path() != CALLBACK_PATH {
        return Callback::Unrelated;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (_, Some(error)) => Callback::Denied(error),
        (Some(code), None) => Callback::Authorized(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        }),
        (None, None) => Callback::Denied("missing authorization code".to_string()),
    }
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>drivecopy - Authorized</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Successful</h1>
    <p>drivecopy can now access your Google Drive.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>drivecopy - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{message}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#
    )
}

// ============================================================================
// DriveAuthAdapter
// ============================================================================

/// Runs the interactive login and token refresh
///
/// 1. Binds the loopback callback server
/// 2. Opens the user's browser at the Google consent page
/// 3. Waits for the redirect and checks its CSRF state
/// 4. Exchanges the authorization code for tokens
pub struct DriveAuthAdapter {
    config: OAuth2Config,
}

impl DriveAuthAdapter {
    pub fn new(config: OAuth2Config) -> Self {
        Self { config }
    }

    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");
        let flow = PKCEFlow::new(&self.config)?;
        let server = LocalCallbackServer::bind(self.config.redirect_port).await?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!(url = %auth_url, "Open this URL to authorize drivecopy");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Could not open a browser; open the URL manually");
        }

        let callback = tokio::time::timeout(LOGIN_TIMEOUT, server.wait_for_callback())
            .await
            .context("Timed out waiting for the authorization redirect")??;
        if callback.state != *csrf_token.secret() {
            bail!("Authorization response state does not match the request");
        }

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;
        if tokens.refresh_token.is_none() {
            warn!("Authorization server did not issue a refresh token");
        }
        info!("OAuth2 login completed");
        Ok(tokens)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        PKCEFlow::new(&self.config)?.refresh_token(refresh_token).await
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }
}

// ============================================================================
// OAuthCredentialProvider
// ============================================================================

/// [`ICredentialProvider`] reading tokens from a [`TokenStorage`]
///
/// Refreshes the access token when it is expired or about to expire, and
/// writes the refreshed pair back to storage.
pub struct OAuthCredentialProvider {
    auth: DriveAuthAdapter,
    storage: Arc<dyn TokenStorage>,
    cached: Mutex<Option<Tokens>>,
}

impl OAuthCredentialProvider {
    pub fn new(config: OAuth2Config, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            auth: DriveAuthAdapter::new(config),
            storage,
            cached: Mutex::new(None),
        }
    }

    fn credential(&self, tokens: &Tokens) -> Credential {
        let config = self.auth.config();
        Credential {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ICredentialProvider for OAuthCredentialProvider {
    async fn get_credential(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;

        let tokens = match cached.take() {
            Some(tokens) => tokens,
            None => self
                .storage
                .load()?
                .context("Not authorized; run `drivecopy auth login` first")?,
        };

        let tokens = if tokens.expires_within(Duration::seconds(REFRESH_MARGIN_SECS)) {
            let refresh_token = tokens
                .refresh_token
                .as_deref()
                .context("Access token expired and no refresh token is stored; log in again")?;
            let refreshed = self.auth.refresh(refresh_token).await?;
            self.storage
                .store(&refreshed)
                .context("Failed to persist refreshed tokens")?;
            debug!(expires_at = %refreshed.expires_at, "Access token refreshed");
            refreshed
        } else {
            tokens
        };

        let credential = self.credential(&tokens);
        *cached = Some(tokens);
        Ok(credential)
    }
}
