//! Client error types.

use std::fmt;

use quickevent_core::DraftError;
use quickevent_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can reach the submission boundary.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// A required form field is empty.
    Validation(DraftError),
    /// No usable credential: consent denied or timed out, or the OAuth client
    /// configuration is missing or invalid.
    Auth(ProviderError),
    /// The calendar service could not be reached or rejected the event.
    Api(ProviderError),
    /// IO error.
    Io(std::io::Error),
}

impl ClientError {
    /// Short title for dialogs and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration error",
            Self::Validation(_) => "validation error",
            Self::Auth(_) => "authentication error",
            Self::Api(_) => "calendar error",
            Self::Io(_) => "IO error",
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Validation(err) => write!(f, "{}", err),
            Self::Auth(err) => write!(f, "authentication error: {}", err),
            Self::Api(err) => write!(f, "calendar error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Auth(err) | Self::Api(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<DraftError> for ClientError {
    fn from(err: DraftError) -> Self {
        Self::Validation(err)
    }
}
