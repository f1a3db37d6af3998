//! Core types: event drafts, datetime composition, event links, tracing

pub mod draft;
pub mod event;
pub mod tracing;

pub use draft::{DraftError, DraftField, EventDraft, compose_datetime};
pub use event::EventLink;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
