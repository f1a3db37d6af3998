//! Credential acquisition for the Google Calendar API.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{AuthStatus, Authenticator, BoxFuture};

use super::config::GoogleConfig;
use super::oauth::{ConsentFlow, OAuthClient};
use super::tokens::{TokenInfo, TokenStorage};

/// Hands out Google credentials, going through the cache, a refresh, or the
/// browser consent flow, in that order.
pub struct GoogleAuthenticator<F: ConsentFlow = OAuthClient> {
    config: GoogleConfig,
    storage: TokenStorage,
    flow: F,
    loaded: AtomicBool,
    /// Serializes acquisitions so two submissions never open two browsers.
    in_flight: Mutex<()>,
}

impl GoogleAuthenticator<OAuthClient> {
    /// Creates an authenticator using the real OAuth endpoints.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        let flow = OAuthClient::new(config.timeout, config.loopback_port_range)?;
        Self::with_flow(config, flow)
    }
}

impl<F: ConsentFlow> GoogleAuthenticator<F> {
    /// Creates an authenticator driving `flow` for consent and refresh.
    pub fn with_flow(config: GoogleConfig, flow: F) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;
        let storage = TokenStorage::new(&config.token_path);
        Ok(Self {
            config,
            storage,
            flow,
            loaded: AtomicBool::new(false),
            in_flight: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Reads the token file the first time it is needed.
    ///
    /// An unreadable file is treated as an empty cache; the next consent
    /// overwrites it.
    fn ensure_loaded(&self) {
        if self.loaded.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.storage.load() {
            warn!("ignoring cached credential: {}", e);
        }
    }

    async fn acquire(&self) -> ProviderResult<TokenInfo> {
        let _guard = self.in_flight.lock().await;
        self.ensure_loaded();

        let cached = self.storage.get();
        if let Some(token) = cached.as_ref() {
            if token.is_valid_for(&self.config.scopes) {
                debug!("using cached credential");
                return Ok(token.clone());
            }

            if token.has_scopes(&self.config.scopes)
                && let Some(refresh_token) = token.refresh_token.as_deref()
            {
                info!("cached credential expired, refreshing");
                let credentials = self.config.credentials.resolve()?;
                match self.flow.refresh(&credentials, refresh_token).await {
                    Ok(refreshed) => {
                        return self
                            .storage
                            .update_access_token(refreshed.access_token, refreshed.expires_in);
                    }
                    Err(e) if e.is_authentication() => {
                        warn!("refresh rejected, asking for consent again: {}", e);
                    }
                    Err(e) => return Err(e),
                }
            } else {
                info!("cached credential cannot be reused, asking for consent");
            }
        }

        let credentials = self.config.credentials.resolve()?;
        let mut token = self.flow.authorize(&credentials, &self.config.scopes).await?;

        // Google only returns a refresh token on the first consent for a client
        if token.refresh_token.is_none() {
            token.refresh_token = cached.and_then(|previous| previous.refresh_token);
        }

        self.storage.set(token.clone())?;
        info!("stored new credential in {:?}", self.storage.path());
        Ok(token)
    }
}

impl<F: ConsentFlow> Authenticator for GoogleAuthenticator<F> {
    fn obtain_credential(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>> {
        Box::pin(self.acquire())
    }

    fn status(&self) -> AuthStatus {
        self.ensure_loaded();
        match self.storage.get() {
            Some(token) => AuthStatus {
                has_credential: true,
                has_required_scopes: token.has_scopes(&self.config.scopes),
                expires_at: token.expires_at,
                is_expired: token.is_expired(),
                can_refresh: token.refresh_token.is_some(),
            },
            None => AuthStatus::default(),
        }
    }

    fn logout(&self) -> ProviderResult<()> {
        self.loaded.store(true, Ordering::Release);
        self.storage.clear()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex as StdMutex;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::google::config::{CredentialsSource, OAuthCredentials};
    use crate::google::oauth::RefreshedToken;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar";

    #[derive(Default)]
    struct FakeFlow {
        authorize_calls: StdMutex<u32>,
        refresh_calls: StdMutex<u32>,
        reject_refresh: bool,
        deny_consent: bool,
    }

    impl FakeFlow {
        fn authorizations(&self) -> u32 {
            *self.authorize_calls.lock().unwrap()
        }

        fn refreshes(&self) -> u32 {
            *self.refresh_calls.lock().unwrap()
        }
    }

    impl ConsentFlow for FakeFlow {
        fn authorize<'a>(
            &'a self,
            _credentials: &'a OAuthCredentials,
            scopes: &'a [String],
        ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
            Box::pin(async move {
                *self.authorize_calls.lock().unwrap() += 1;
                if self.deny_consent {
                    return Err(ProviderError::authentication("authorization denied: access_denied"));
                }
                Ok(TokenInfo::new(
                    "consented",
                    Some("refresh-from-consent".to_string()),
                    Some(3600),
                    scopes.to_vec(),
                ))
            })
        }

        fn refresh<'a>(
            &'a self,
            _credentials: &'a OAuthCredentials,
            _refresh_token: &'a str,
        ) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
            Box::pin(async move {
                *self.refresh_calls.lock().unwrap() += 1;
                if self.reject_refresh {
                    return Err(ProviderError::authentication("invalid_grant"));
                }
                Ok(RefreshedToken {
                    access_token: "refreshed".to_string(),
                    expires_in: Some(3600),
                })
            })
        }
    }

    fn config(dir: &Path) -> GoogleConfig {
        GoogleConfig::new(CredentialsSource::Inline(OAuthCredentials::new(
            "test.apps.googleusercontent.com",
            "secret",
        )))
        .with_token_path(dir.join("token.json"))
    }

    fn seed(dir: &Path, token: TokenInfo) {
        TokenStorage::new(dir.join("token.json")).set(token).unwrap();
    }

    fn valid_token() -> TokenInfo {
        TokenInfo::new("cached", Some("refresh".to_string()), Some(3600), vec![SCOPE.to_string()])
    }

    fn expired_token() -> TokenInfo {
        let mut token = valid_token();
        token.expires_at = Some(Utc::now() - Duration::minutes(5));
        token
    }

    #[tokio::test]
    async fn cached_valid_token_skips_consent() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), valid_token());

        let auth = GoogleAuthenticator::with_flow(config(dir.path()), FakeFlow::default()).unwrap();
        let token = auth.obtain_credential().await.unwrap();

        assert_eq!(token.access_token, "cached");
        assert_eq!(auth.flow.authorizations(), 0);
        assert_eq!(auth.flow.refreshes(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), expired_token());

        let auth = GoogleAuthenticator::with_flow(config(dir.path()), FakeFlow::default()).unwrap();
        let token = auth.obtain_credential().await.unwrap();

        assert_eq!(token.access_token, "refreshed");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(auth.flow.refreshes(), 1);
        assert_eq!(auth.flow.authorizations(), 0);

        let stored = TokenStorage::new(dir.path().join("token.json"));
        stored.load().unwrap();
        assert_eq!(stored.get().unwrap().access_token, "refreshed");
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_consent() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), expired_token());

        let flow = FakeFlow {
            reject_refresh: true,
            ..Default::default()
        };
        let auth = GoogleAuthenticator::with_flow(config(dir.path()), flow).unwrap();
        let token = auth.obtain_credential().await.unwrap();

        assert_eq!(token.access_token, "consented");
        assert_eq!(auth.flow.refreshes(), 1);
        assert_eq!(auth.flow.authorizations(), 1);
    }

    #[tokio::test]
    async fn missing_cache_runs_consent_once() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuthenticator::with_flow(config(dir.path()), FakeFlow::default()).unwrap();

        let first = auth.obtain_credential().await.unwrap();
        let second = auth.obtain_credential().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(auth.flow.authorizations(), 1);
        assert!(dir.path().join("token.json").exists());
    }

    #[tokio::test]
    async fn wrong_scopes_trigger_consent() {
        let dir = tempfile::tempdir().unwrap();
        let mut token = valid_token();
        token.scopes = vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()];
        seed(dir.path(), token);

        let auth = GoogleAuthenticator::with_flow(config(dir.path()), FakeFlow::default()).unwrap();
        auth.obtain_credential().await.unwrap();

        assert_eq!(auth.flow.refreshes(), 0);
        assert_eq!(auth.flow.authorizations(), 1);
    }

    #[tokio::test]
    async fn denied_consent_is_authentication_error() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow {
            deny_consent: true,
            ..Default::default()
        };
        let auth = GoogleAuthenticator::with_flow(config(dir.path()), flow).unwrap();

        let err = auth.obtain_credential().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!dir.path().join("token.json").exists());
    }

    #[tokio::test]
    async fn missing_client_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let config = GoogleConfig {
            credentials: CredentialsSource::File(dir.path().join("credentials.json")),
            ..config
        };
        let auth = GoogleAuthenticator::with_flow(config, FakeFlow::default()).unwrap();

        let err = auth.obtain_credential().await.unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
        assert_eq!(auth.flow.authorizations(), 0);
    }

    #[tokio::test]
    async fn cached_token_works_without_client_file() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), valid_token());
        let config = GoogleConfig {
            credentials: CredentialsSource::File(dir.path().join("credentials.json")),
            ..config(dir.path())
        };
        let auth = GoogleAuthenticator::with_flow(config, FakeFlow::default()).unwrap();

        assert_eq!(auth.obtain_credential().await.unwrap().access_token, "cached");
    }

    #[tokio::test]
    async fn corrupt_cache_runs_consent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token.json"), "garbage").unwrap();

        let auth = GoogleAuthenticator::with_flow(config(dir.path()), FakeFlow::default()).unwrap();
        assert_eq!(auth.obtain_credential().await.unwrap().access_token, "consented");
    }

    #[test]
    fn status_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), expired_token());

        let auth = GoogleAuthenticator::with_flow(config(dir.path()), FakeFlow::default()).unwrap();
        let status = auth.status();
        assert!(status.has_credential);
        assert!(status.is_expired);
        assert!(status.can_refresh);
        assert!(status.is_usable());

        auth.logout().unwrap();
        assert_eq!(auth.status(), AuthStatus::default());
        assert!(!dir.path().join("token.json").exists());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path()).with_scopes(vec![]);
        assert!(GoogleAuthenticator::with_flow(config, FakeFlow::default()).is_err());
    }
}
