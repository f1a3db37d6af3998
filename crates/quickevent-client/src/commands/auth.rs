//! Authentication commands.

use std::path::{Path, PathBuf};

use tracing::info;

use quickevent_providers::Authenticator;
use quickevent_providers::google::{GoogleAuthenticator, OAuthCredentials};

use crate::config::{self, ClientConfig};
use crate::error::{ClientError, ClientResult};

/// Client credentials given on the command line.
#[derive(Debug, Default)]
pub struct LoginCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
}

impl LoginCredentials {
    /// Returns the credentials to persist, if any were passed.
    ///
    /// Priority: `--client-id` + `--client-secret`, then `--credentials-file`.
    fn resolve(&self) -> ClientResult<Option<OAuthCredentials>> {
        match (&self.client_id, &self.client_secret, &self.credentials_file) {
            (Some(id), Some(secret), _) => Ok(Some(OAuthCredentials::new(id, secret))),
            (Some(_), None, _) | (None, Some(_), _) => Err(ClientError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            )),
            (None, None, Some(path)) => OAuthCredentials::from_file(path)
                .map(Some)
                .map_err(|e| {
                    ClientError::Config(format!(
                        "failed to load credentials from {}: {}",
                        path.display(),
                        e
                    ))
                }),
            (None, None, None) => Ok(None),
        }
    }
}

/// Runs the Google consent flow and caches the credential.
///
/// Credentials passed on the command line are written to `config.toml`
/// once authentication succeeds, so later runs find them.
pub async fn login(
    credentials: LoginCredentials,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let provided = credentials.resolve()?;

    let mut effective = config.clone();
    if let Some(ref creds) = provided {
        creds
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;
        effective.google.client_id = Some(creds.client_id.clone());
        effective.google.client_secret = Some(creds.client_secret.clone());
    }

    let authenticator = authenticator(&effective)?;

    if force {
        authenticator.logout().map_err(ClientError::Auth)?;
    } else if authenticator.status().is_usable() {
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    authenticator
        .obtain_credential()
        .await
        .map_err(ClientError::Auth)?;
    info!("Google authentication successful");

    if let Some(creds) = provided {
        config::save_credentials(config_path, &creds.client_id, &creds.client_secret)?;
        println!("Credentials saved to {}", config_path.display());
    }

    println!("Authentication successful!");
    println!(
        "Your token has been saved to {}",
        authenticator.config().token_path.display()
    );
    Ok(())
}

/// Prints the state of the cached credential.
pub fn status(config: &ClientConfig) -> ClientResult<()> {
    let authenticator = authenticator(config)?;
    let status = authenticator.status();

    println!("token: {}", authenticator.config().token_path.display());
    if !status.has_credential {
        println!("status: not authenticated (run `quickevent auth login`)");
        return Ok(());
    }

    let state = match (status.is_expired, status.can_refresh) {
        (false, _) => "valid",
        (true, true) => "expired, will refresh on next use",
        (true, false) => "expired, consent required",
    };
    println!("status: {}", state);
    if let Some(expires_at) = status.expires_at {
        println!(
            "expires: {}",
            expires_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        );
    }
    if !status.has_required_scopes {
        println!("scopes: missing calendar access, consent required");
    }
    Ok(())
}

/// Deletes the cached credential.
pub fn logout(config: &ClientConfig) -> ClientResult<()> {
    let authenticator = authenticator(config)?;
    authenticator.logout().map_err(ClientError::Auth)?;
    println!("Removed {}", authenticator.config().token_path.display());
    Ok(())
}

fn authenticator(config: &ClientConfig) -> ClientResult<GoogleAuthenticator> {
    let google = config.to_google_config()?;
    GoogleAuthenticator::new(google).map_err(|e| ClientError::Config(e.to_string()))
}
