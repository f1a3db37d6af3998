//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/quickevent/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references,
//! see [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use quickevent_providers::DEFAULT_TIME_ZONE;
use quickevent_providers::google::{CredentialsSource, GoogleConfig, OAuthCredentials};

use crate::error::{ClientError, ClientResult};
use crate::secret::{self, SecretRef};

/// Configuration for quickevent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug logging.
    pub debug: bool,

    /// Google Calendar settings.
    pub google: GoogleSettings,

    /// Defaults applied to created events.
    pub event: EventSettings,
}

/// Google Calendar settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Google Cloud Console client JSON, used when no inline credentials are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Path to token storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,

    /// Calendar to insert into, `primary` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,

    /// First and last port tried for the OAuth redirect listener.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback_port_range: Option<[u16; 2]>,

    /// HTTP timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Event defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// IANA timezone start and end times are interpreted in.
    pub time_zone: String,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist; the default file is optional and
    /// defaults apply when it is missing.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    debug!("no config file at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickevent")
    }

    /// Builds the provider configuration.
    ///
    /// Secret references are expanded here; the client JSON file, if that is
    /// where credentials come from, is only read when authentication needs it.
    pub fn to_google_config(&self) -> ClientResult<GoogleConfig> {
        let credentials = self.google.credentials_source()?;
        let mut config = GoogleConfig::new(credentials).with_time_zone(&self.event.time_zone);

        if let Some(ref path) = self.google.token_path {
            config = config.with_token_path(path);
        }
        if let Some(ref id) = self.google.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some([start, end]) = self.google.loopback_port_range {
            config = config.with_loopback_port_range(start, end);
        }
        if let Some(secs) = self.google.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate().map_err(ClientError::Config)?;
        Ok(config)
    }

    /// Returns a copy safe to print: plain-text secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(ref secret) = self.google.client_secret {
            copy.google.client_secret = Some(SecretRef::parse(secret).redacted());
        }
        copy
    }
}

impl GoogleSettings {
    /// Picks where the OAuth client identity comes from.
    ///
    /// Priority: inline `client_id` + `client_secret`, then
    /// `credentials_file`, then the default `credentials.json` next to the
    /// config file.
    pub fn credentials_source(&self) -> ClientResult<CredentialsSource> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => {
                let id = secret::resolve(id)
                    .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;
                let secret = secret::resolve(secret).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_secret: {}", e))
                })?;
                Ok(CredentialsSource::Inline(OAuthCredentials::new(id, secret)))
            }
            (Some(_), None) => Err(ClientError::Config(
                "client_secret is missing from the [google] section".to_string(),
            )),
            (None, Some(_)) => Err(ClientError::Config(
                "client_id is missing from the [google] section".to_string(),
            )),
            (None, None) => Ok(CredentialsSource::File(
                self.credentials_file
                    .clone()
                    .unwrap_or_else(GoogleConfig::default_credentials_file),
            )),
        }
    }
}

/// Writes `client_id` and `client_secret` into the `[google]` table of
/// `path`, keeping the rest of the file (comments included) untouched.
pub fn save_credentials(path: &Path, client_id: &str, client_secret: &str) -> ClientResult<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::Config(format!("could not parse {} for writing: {}", path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!("`google` in {} is not a table", path.display()))
    })?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    debug!("saved credentials to {}", path.display());
    Ok(())
}
