//! Authentication and event insertion for quickevent.
//!
//! - [`Authenticator`] - hands out a usable credential
//! - [`EventInserter`] - creates one event with that credential
//! - [`NewEvent`] - the provider-agnostic event to create
//! - [`ProviderError`] - error types for both
//!
//! # Architecture
//!
//! ```text
//!  EventDraft ──► NewEvent ─────────────┐
//!                                       ▼
//! ┌─────────────────────┐    ┌──────────────────────┐
//! │ GoogleAuthenticator │───►│ GoogleCalendarClient │──► Calendar API v3
//! └─────────┬───────────┘    └──────────────────────┘
//!           │ cache / refresh / consent
//!           ▼
//!   google-token.json
//! ```

pub mod error;
pub mod google;
pub mod new_event;
pub mod provider;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use new_event::{DEFAULT_TIME_ZONE, NewEvent, WEEKLY_RRULE};
pub use provider::{AuthStatus, Authenticator, BoxFuture, EventInserter};
