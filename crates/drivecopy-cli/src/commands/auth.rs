//! Auth commands - Login, Logout, and Status for Google Drive access
//!
//! 1. `login`  - Runs the OAuth2 PKCE flow and stores the tokens
//! 2. `logout` - Removes stored tokens
//! 3. `status` - Shows whether tokens are stored and when they expire

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use drivecopy_core::config::Config;
use drivecopy_drive::auth::{token_storage_from_config, DriveAuthAdapter, OAuth2Config};
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize drivecopy to access Google Drive
    Login {
        /// OAuth client ID (overrides auth.client_id)
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret (overrides auth.client_secret)
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Remove stored tokens
    Logout,
    /// Check authorization status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        match self {
            AuthCommand::Login {
                client_id,
                client_secret,
            } => {
                let mut auth = config.auth.clone();
                if client_id.is_some() {
                    auth.client_id = client_id.clone();
                }
                if client_secret.is_some() {
                    auth.client_secret = client_secret.clone();
                }
                execute_login(&auth, &*fmt).await
            }
            AuthCommand::Logout => execute_logout(config, &*fmt),
            AuthCommand::Status => execute_status(config, &*fmt, format),
        }
    }
}

async fn execute_login(
    auth: &drivecopy_core::config::AuthConfig,
    fmt: &dyn OutputFormatter,
) -> Result<()> {
    let oauth = OAuth2Config::from_auth_config(auth)
        .context("Pass --client-id and --client-secret, or set them in the config file")?;
    let storage = token_storage_from_config(auth)?;
    info!(client_id = %oauth.client_id, "Starting OAuth2 login");

    fmt.info("Opening browser for Google sign-in...");
    let tokens = DriveAuthAdapter::new(oauth)
        .login()
        .await
        .context("OAuth2 login failed")?;

    storage
        .store(&tokens)
        .with_context(|| format!("Failed to store tokens in {}", storage.location()))?;

    fmt.success("Authorized");
    fmt.info(&format!("Tokens stored in {}", storage.location()));
    Ok(())
}

fn execute_logout(config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
    let storage = token_storage_from_config(&config.auth)?;
    storage.clear()?;
    info!(store = %storage.location(), "Logged out");

    fmt.success("Logged out");
    fmt.info(&format!("Tokens removed from {}", storage.location()));
    Ok(())
}

fn execute_status(config: &Config, fmt: &dyn OutputFormatter, format: OutputFormat) -> Result<()> {
    let storage = token_storage_from_config(&config.auth)?;
    let tokens = storage.load()?;

    let token_status = match &tokens {
        None => "Not found",
        Some(t) if !t.is_expired() => "Valid",
        Some(t) if t.refresh_token.is_some() => "Expired (will refresh)",
        Some(_) => "Expired",
    };

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "authenticated": tokens.is_some(),
            "token_status": token_status,
            "token_store": storage.location(),
            "expires_at": tokens.as_ref().map(|t| t.expires_at.to_rfc3339()),
            "has_refresh_token": tokens.as_ref().is_some_and(|t| t.refresh_token.is_some()),
        }));
        return Ok(());
    }

    match &tokens {
        None => {
            fmt.info("Authentication status: Not authorized");
            fmt.info("Run 'drivecopy auth login' to authorize");
        }
        Some(t) => {
            fmt.success("Authorized");
            fmt.info(&format!("Token status:  {token_status}"));
            fmt.info(&format!("Token store:   {}", storage.location()));
            let remaining = t.expires_at - Utc::now();
            if remaining.num_seconds() > 0 {
                fmt.info(&format!(
                    "Expires at:    {} (in {} min)",
                    t.expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    remaining.num_minutes()
                ));
            } else {
                fmt.info(&format!(
                    "Expired at:    {}",
                    t.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
        }
    }
    Ok(())
}
