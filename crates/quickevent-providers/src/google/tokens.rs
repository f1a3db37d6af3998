//! The cached OAuth credential and its on-disk store.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Tokens are considered expired this many seconds before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth credential: access/refresh token pair plus metadata.
///
/// Loading also accepts the `authorized_user` layout written by Google's
/// client libraries (`token`, `refresh_token`, `scopes`, `expiry`, ...), so an
/// existing `token.json` keeps working. Saving always writes this layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The bearer token for API requests.
    #[serde(alias = "token")]
    pub access_token: String,

    /// The token used to obtain new access tokens without user interaction.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// When the access token stops being usable (already shortened by the
    /// expiry margin).
    #[serde(default, alias = "expiry")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the access token was last obtained.
    #[serde(default = "Utc::now")]
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a token from an OAuth token response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// A token without expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    /// Returns true if every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Returns true if the token is unexpired and carries `required`.
    pub fn is_valid_for(&self, required: &[String]) -> bool {
        !self.is_expired() && self.has_scopes(required)
    }

    /// Replaces the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// The token file plus an in-memory copy of its content.
///
/// Writes go through a temp file and a rename so a crash never leaves a
/// half-written token behind.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TokenInfo>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenInfo>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Loads the token file into memory.
    ///
    /// Returns Ok(true) if a token was loaded, Ok(false) if the file does not exist.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
                .with_source(e)
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!("loaded cached credential from {:?}", self.path);
        *self.write() = Some(tokens);
        Ok(true)
    }

    /// Writes the in-memory token to disk.
    pub fn save(&self) -> ProviderResult<()> {
        let content = {
            let tokens = self.read();
            let tokens = tokens
                .as_ref()
                .ok_or_else(|| ProviderError::internal("no credential to save"))?;
            serde_json::to_string_pretty(tokens).map_err(|e| {
                ProviderError::internal(format!("failed to serialize credential: {}", e))
            })?
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, content.as_bytes()).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
                .with_source(e)
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!("saved credential to {:?}", self.path);
        Ok(())
    }

    /// Returns a clone of the current token, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.read().clone()
    }

    /// Replaces the token and persists it.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        *self.write() = Some(tokens);
        self.save()
    }

    /// Swaps in a refreshed access token, persists it and returns the
    /// updated credential.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<TokenInfo> {
        let updated = {
            let mut tokens = self.write();
            let token = tokens
                .as_mut()
                .ok_or_else(|| ProviderError::internal("no credential to update"))?;
            token.update_access_token(access_token, expires_in_secs);
            token.clone()
        };
        self.save()?;
        Ok(updated)
    }

    /// Removes the token from memory and disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.write() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!("removed cached credential {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes `content` to `path`, readable by the owner only.
///
/// The mode is set on creation and again on the open handle, so a stale file
/// left with wider permissions is narrowed before the secret lands in it.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content)?;
    file.sync_all()
}
