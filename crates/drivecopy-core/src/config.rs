//! Configuration module for drivecopy.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivecopy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub drive: DriveConfig,
    pub backoff: BackoffConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID. `None` until configured.
    pub client_id: Option<String>,
    /// OAuth client secret issued with the client ID.
    pub client_secret: Option<String>,
    /// Where tokens are persisted: `keyring` or `file`.
    pub token_store: String,
    /// Token file used when `token_store` is `file`.
    pub token_file: PathBuf,
    /// Loopback port for the authorization redirect.
    pub redirect_port: u16,
}

/// Remote service endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL serving both the metadata and the upload endpoints.
    pub api_base_url: String,
}

/// Retry policy applied to every remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, doubled after each further one.
    pub base_delay_ms: u64,
    /// Exclusive upper bound of the random jitter added to each delay.
    pub max_jitter_ms: u64,
}

/// Local transfer settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Directory for temporary archives. System temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file written in addition to stderr.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivecopy/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivecopy")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for AuthConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("drivecopy");
        Self {
            client_id: None,
            client_secret: None,
            token_store: "keyring".to_string(),
            token_file: data_dir.join("tokens.json"),
            redirect_port: 8400,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com".to_string(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_TOKEN_STORES: &[&str] = &["keyring", "file"];

impl Config {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- auth ---
        if !VALID_TOKEN_STORES.contains(&self.auth.token_store.as_str()) {
            errors.push(ValidationError {
                field: "auth.token_store".into(),
                message: format!(
                    "invalid store '{}'; valid options: {}",
                    self.auth.token_store,
                    VALID_TOKEN_STORES.join(", ")
                ),
            });
        }
        if self.auth.client_id.as_deref() == Some("") {
            errors.push(ValidationError {
                field: "auth.client_id".into(),
                message: "must not be empty when set".into(),
            });
        }
        if self.auth.redirect_port == 0 {
            errors.push(ValidationError {
                field: "auth.redirect_port".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- drive ---
        let url = self.drive.api_base_url.as_str();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            errors.push(ValidationError {
                field: "drive.api_base_url".into(),
                message: format!("not an http(s) URL: {url}"),
            });
        }

        // --- backoff ---
        if self.backoff.max_attempts == 0 {
            errors.push(ValidationError {
                field: "backoff.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.backoff.max_attempts > 16 {
            errors.push(ValidationError {
                field: "backoff.max_attempts".into(),
                message: "must not exceed 16".into(),
            });
        }

        // --- transfer ---
        if let Some(dir) = &self.transfer.temp_dir {
            if !dir.is_dir() {
                errors.push(ValidationError {
                    field: "transfer.temp_dir".into(),
                    message: format!("directory does not exist: {}", dir.display()),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- auth ---

    pub fn auth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    pub fn auth_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.auth.client_secret = Some(client_secret.into());
        self
    }

    pub fn auth_token_store(mut self, store: impl Into<String>) -> Self {
        self.config.auth.token_store = store.into();
        self
    }

    pub fn auth_token_file(mut self, file: PathBuf) -> Self {
        self.config.auth.token_file = file;
        self
    }

    pub fn auth_redirect_port(mut self, port: u16) -> Self {
        self.config.auth.redirect_port = port;
        self
    }

    // --- drive ---

    pub fn drive_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.api_base_url = url.into();
        self
    }

    // --- backoff ---

    pub fn backoff_max_attempts(mut self, n: u32) -> Self {
        self.config.backoff.max_attempts = n;
        self
    }

    pub fn backoff_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.backoff.base_delay_ms = ms;
        self
    }

    pub fn backoff_max_jitter_ms(mut self, ms: u64) -> Self {
        self.config.backoff.max_jitter_ms = ms;
        self
    }

    // --- transfer ---

    pub fn transfer_temp_dir(mut self, dir: PathBuf) -> Self {
        self.config.transfer.temp_dir = Some(dir);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
