//! Google Calendar implementation.
//!
//! # Authentication Flow
//!
//! 1. The user registers their own OAuth client (a desktop app) in the Google
//!    Cloud Console and saves its JSON file
//! 2. A loopback listener is started on the first free port of the range
//! 3. The browser opens Google's consent page with a PKCE challenge
//! 4. Google redirects to the loopback listener with the authorization code
//! 5. The code is exchanged for access and refresh tokens
//! 6. Tokens are persisted and reused, refreshed when they expire
//!
//! # Example
//!
//! ```ignore
//! use quickevent_providers::google::{
//!     CredentialsSource, GoogleAuthenticator, GoogleCalendarClient, GoogleConfig,
//! };
//! use quickevent_providers::{Authenticator, EventInserter, NewEvent};
//!
//! let config = GoogleConfig::new(CredentialsSource::File(GoogleConfig::default_credentials_file()));
//! let auth = GoogleAuthenticator::new(config.clone())?;
//! let client = GoogleCalendarClient::new(&config.calendar_id, config.timeout, &config.user_agent)?;
//!
//! let credential = auth.obtain_credential().await?;
//! let event = NewEvent::new("Standup", "2024-05-01T09:00:00", "2024-05-01T09:15:00");
//! let link = client.insert_event(&credential, &event).await?;
//! ```

mod auth;
mod client;
mod config;
mod oauth;
mod tokens;

pub use auth::GoogleAuthenticator;
pub use client::GoogleCalendarClient;
pub use config::{CredentialsSource, GoogleConfig, OAuthCredentials};
pub use oauth::{ConsentFlow, OAuthClient, PkceFlow, RefreshedToken};
pub use tokens::{TokenInfo, TokenStorage};
