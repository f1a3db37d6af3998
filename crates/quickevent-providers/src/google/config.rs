//! Google Calendar configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};
use crate::new_event::DEFAULT_TIME_ZONE;

/// OAuth 2.0 client identity registered in the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Structure of Google's OAuth client JSON file.
///
/// Supports the Cloud Console layout (an `installed` or `web` section) and a
/// flat layout with `client_id`/`client_secret` at the root.
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: GoogleCredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err("credentials file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level".to_string())
    }

    /// Checks that the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Where the OAuth client identity comes from.
///
/// Resolution is deferred until the consent flow or a refresh actually needs
/// it, so a cached credential keeps working without the client file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Credentials already known.
    Inline(OAuthCredentials),
    /// A Google Cloud Console JSON file.
    File(PathBuf),
}

impl CredentialsSource {
    /// Loads and validates the credentials.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing or unreadable or
    /// the credentials are malformed.
    pub fn resolve(&self) -> ProviderResult<OAuthCredentials> {
        let credentials = match self {
            Self::Inline(credentials) => credentials.clone(),
            Self::File(path) => {
                if !path.exists() {
                    return Err(ProviderError::configuration(format!(
                        "OAuth client file {} not found; download it from the Google Cloud Console",
                        path.display()
                    )));
                }
                OAuthCredentials::from_file(path).map_err(|e| {
                    ProviderError::configuration(format!("{}: {}", path.display(), e))
                })?
            }
        };

        credentials.validate().map_err(|e| {
            ProviderError::configuration(format!("invalid OAuth client credentials: {}", e))
        })?;

        Ok(credentials)
    }
}

/// Configuration for the Google authenticator and calendar client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Where the OAuth client identity is read from.
    pub credentials: CredentialsSource,

    /// Path of the cached credential.
    ///
    /// Defaults to `$XDG_DATA_HOME/quickevent/google-token.json`.
    pub token_path: PathBuf,

    /// Calendar new events are inserted into.
    pub calendar_id: String,

    /// IANA timezone event start/end are pinned to.
    pub time_zone: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Ports tried, in order, for the loopback OAuth listener.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write access to calendars.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";

    pub const DEFAULT_PORT_RANGE: (u16, u16) = (8080, 8090);

    pub fn new(credentials: CredentialsSource) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("quickevent/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: Self::DEFAULT_PORT_RANGE,
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Returns `$XDG_DATA_HOME/quickevent/google-token.json`.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickevent")
            .join("google-token.json")
    }

    /// Returns `$XDG_CONFIG_HOME/quickevent/credentials.json`.
    pub fn default_credentials_file() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickevent")
            .join("credentials.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Validates the configuration.
    ///
    /// OAuth client credentials are not resolved here; see
    /// [`CredentialsSource::resolve`].
    pub fn validate(&self) -> Result<(), String> {
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        if self.calendar_id.trim().is_empty() {
            return Err("calendar_id must not be empty".to_string());
        }

        if self.time_zone.trim().is_empty() {
            return Err("time_zone must not be empty".to_string());
        }

        Ok(())
    }
}
