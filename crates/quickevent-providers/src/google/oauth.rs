//! OAuth 2.0 authorization code flow with PKCE for Google APIs.
//!
//! The flow follows the desktop-application recipe:
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a loopback listener on the first free port in the configured range
//! 3. Open the browser on Google's consent page
//! 4. Receive `/callback?code=…&state=…` on the loopback listener
//! 5. Exchange the code (with the verifier) for access and refresh tokens

use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_PATH: &str = "/callback";

/// How long the user has to finish the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// A renewed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

/// The token endpoint operations the authenticator relies on.
pub trait ConsentFlow: Send + Sync {
    /// Runs the interactive consent flow and returns a fresh credential.
    fn authorize<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Exchanges a refresh token for a new access token.
    fn refresh<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<RefreshedToken>>;
}

/// OAuth client talking to Google's endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    http_client: reqwest::Client,
    port_range: (u16, u16),
}

impl OAuthClient {
    /// Creates a new OAuth client.
    pub fn new(timeout: Duration, port_range: (u16, u16)) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            port_range,
        })
    }

    async fn run_consent(
        &self,
        credentials: &OAuthCredentials,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(self.port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url = pkce.build_auth_url(&credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth consent flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = wait_for_callback(listener, CALLBACK_TIMEOUT).await?;
        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, refusing the authorization code",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(credentials, &callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    async fn exchange_code(
        &self,
        credentials: &OAuthCredentials,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = self.post_token_form(&params, "token exchange").await?;
        let granted = token_response.granted_scopes(scopes);

        info!("obtained OAuth tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            granted,
        ))
    }

    async fn refresh_access_token(
        &self,
        credentials: &OAuthCredentials,
        refresh_token: &str,
    ) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_form(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_in: token_response.expires_in,
        })
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

impl ConsentFlow for OAuthClient {
    fn authorize<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(self.run_consent(credentials, scopes))
    }

    fn refresh<'a>(
        &'a self,
        credentials: &'a OAuthCredentials,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
        Box::pin(self.refresh_access_token(credentials, refresh_token))
    }
}

/// Binds the first free loopback port in `port_range`.
fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(StdTcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = StdTcpListener::bind(("127.0.0.1", port)) {
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Values carried by a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Accepts connections until one of them is the OAuth redirect.
///
/// The listener lives inside the returned future: when it times out or is
/// dropped, the socket is closed and the port can be bound again.
async fn wait_for_callback(
    listener: StdTcpListener,
    timeout: Duration,
) -> ProviderResult<Callback> {
    listener
        .set_nonblocking(true)
        .map_err(|e| ProviderError::internal(format!("failed to set non-blocking: {}", e)))?;
    let listener = TcpListener::from_std(listener).map_err(|e| {
        ProviderError::internal(format!("failed to register callback listener: {}", e))
    })?;

    let accept_loop = async {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    if let Some(result) = handle_callback(stream).await {
                        return result;
                    }
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    };

    tokio::time::timeout(timeout, accept_loop)
        .await
        .unwrap_or_else(|_| {
            Err(ProviderError::authentication(
                "timed out waiting for the browser consent",
            ))
        })
}

/// Reads one HTTP request, answers it, and returns the parsed callback.
///
/// Returns `None` for requests that are not the redirect (favicon probes, etc.).
async fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let (reader, mut writer) = stream.split();
    let mut request_line = String::new();
    if BufReader::new(reader)
        .read_line(&mut request_line)
        .await
        .is_err()
    {
        return None;
    }

    let Some(result) = parse_callback_request(&request_line) else {
        let _ = writer
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
            .await;
        return None;
    };

    let response = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to quickevent.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    };
    let _ = writer.write_all(response.as_bytes()).await;
    let _ = writer.flush().await;

    Some(result)
}

/// Parses `GET /callback?code=…&state=… HTTP/1.1`.
fn parse_callback_request(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut denied = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => denied = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(reason) = denied {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            reason
        ))));
    }

    Some(match code {
        Some(code) => Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE verifier, challenge and CSRF state for one consent attempt (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// SHA-256 of the verifier, base64url encoded.
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the Google consent URL.
    ///
    /// `access_type=offline` together with `prompt=consent` makes Google
    /// return a refresh token every time.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Returns the granted scopes, or `requested` when Google omits them.
    fn granted_scopes(&self, requested: &[String]) -> Vec<String> {
        match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => requested.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_verifier_length() {
        // 32 bytes base64url without padding
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_values_are_random() {
        let a = PkceFlow::new();
        let b = PkceFlow::new();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let url = flow.build_auth_url(
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &["https://www.googleapis.com/auth/calendar".to_string()],
        );

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=test-client.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", flow.state)));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn callback_with_code_and_state() {
        let parsed = parse_callback_request("GET /callback?state=xyz&code=4%2F0Ab HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Callback {
                code: "4/0Ab".to_string(),
                state: "xyz".to_string(),
            }
        );
    }

    #[test]
    fn callback_denied() {
        let err = parse_callback_request("GET /callback?error=access_denied&state=xyz HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert!(err.is_authentication());
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn callback_without_code() {
        let err = parse_callback_request("GET /callback?state=xyz HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert!(err.message().contains("missing authorization code"));
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_callback_request("GET /favicon.ico HTTP/1.1").is_none());
        assert!(parse_callback_request("POST /callback?code=x HTTP/1.1").is_none());
        assert!(parse_callback_request("").is_none());
    }

    #[test]
    fn bind_reports_exhausted_range() {
        let (held, port) = bind_loopback_server((0, 0)).unwrap();
        let bound = held.local_addr().unwrap().port();
        assert_eq!(port, 0);
        assert_ne!(bound, 0);

        let err = bind_loopback_server((bound, bound)).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn callback_is_received_over_loopback() {
        let (listener, _) = bind_loopback_server((0, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            let mut favicon = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
                .await
                .unwrap();

            let mut redirect = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            redirect
                .write_all(b"GET /callback?code=abc&state=s1 HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
        });

        let callback = wait_for_callback(listener, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(callback.code, "abc");
        assert_eq!(callback.state, "s1");
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn callback_wait_times_out() {
        let (listener, _) = bind_loopback_server((0, 0)).unwrap();
        let err = wait_for_callback(listener, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert!(err.message().contains("timed out"));
    }

    #[tokio::test]
    async fn abandoned_wait_releases_port() {
        let (listener, _) = bind_loopback_server((0, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_callback(listener, CALLBACK_TIMEOUT),
        )
        .await;
        assert!(abandoned.is_err());

        let (_listener, rebound) = bind_loopback_server((port, port)).unwrap();
        assert_eq!(rebound, port);
    }

    #[test]
    fn token_response_scopes() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "expires_in": 3599, "scope": "openid https://www.googleapis.com/auth/calendar", "token_type": "Bearer"}"#,
        )
        .unwrap();
        assert_eq!(
            response.granted_scopes(&[]),
            vec![
                "openid".to_string(),
                "https://www.googleapis.com/auth/calendar".to_string()
            ]
        );

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a"}"#).unwrap();
        let requested = vec!["s".to_string()];
        assert_eq!(response.granted_scopes(&requested), requested);
        assert!(response.refresh_token.is_none());
    }
}
