//! Seams between the form controller and the calendar backend.
//!
//! The controller only sees two narrow traits:
//!
//! - [`Authenticator`] hands out a usable credential
//! - [`EventInserter`] creates one event with that credential
//!
//! Tests substitute fakes for both; the Google implementations live in
//! [`crate::google`].

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use quickevent_core::EventLink;

use crate::error::ProviderResult;
use crate::google::TokenInfo;
use crate::new_event::NewEvent;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so the controller can hold
/// `Arc<dyn Authenticator>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A snapshot of the cached credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthStatus {
    /// Whether a credential is cached.
    pub has_credential: bool,
    /// Whether the cached credential carries every required scope.
    pub has_required_scopes: bool,
    /// When the cached access token expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the cached access token is expired.
    pub is_expired: bool,
    /// Whether an expired token can be renewed without user interaction.
    pub can_refresh: bool,
}

impl AuthStatus {
    /// Returns true if a submission could run without opening a browser.
    pub fn is_usable(&self) -> bool {
        self.has_credential && self.has_required_scopes && (!self.is_expired || self.can_refresh)
    }
}

/// Supplies credentials for calendar requests.
pub trait Authenticator: Send + Sync {
    /// Returns a valid credential.
    ///
    /// Reuses the cached credential when it is still valid, refreshes it when
    /// it expired, and falls back to interactive consent otherwise. A newly
    /// obtained credential is persisted before it is returned.
    ///
    /// # Errors
    ///
    /// Fails when consent is denied or times out, or when the client
    /// application configuration is missing or invalid.
    fn obtain_credential(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>>;

    /// Reports the state of the cached credential without any network access.
    fn status(&self) -> AuthStatus;

    /// Forgets the cached credential.
    fn logout(&self) -> ProviderResult<()>;
}

/// Creates events in a calendar.
pub trait EventInserter: Send + Sync {
    /// Inserts `event` and returns the provider's reference to it.
    ///
    /// One attempt is made; failures are returned as-is.
    fn insert_event<'a>(
        &'a self,
        credential: &'a TokenInfo,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventLink>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_usable_when_valid() {
        let status = AuthStatus {
            has_credential: true,
            has_required_scopes: true,
            ..Default::default()
        };
        assert!(status.is_usable());
    }

    #[test]
    fn status_usable_when_refreshable() {
        let status = AuthStatus {
            has_credential: true,
            has_required_scopes: true,
            is_expired: true,
            can_refresh: true,
            ..Default::default()
        };
        assert!(status.is_usable());
    }

    #[test]
    fn status_not_usable() {
        assert!(!AuthStatus::default().is_usable());

        let expired = AuthStatus {
            has_credential: true,
            has_required_scopes: true,
            is_expired: true,
            can_refresh: false,
            ..Default::default()
        };
        assert!(!expired.is_usable());

        let wrong_scopes = AuthStatus {
            has_credential: true,
            has_required_scopes: false,
            ..Default::default()
        };
        assert!(!wrong_scopes.is_usable());
    }
}
