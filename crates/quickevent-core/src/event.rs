//! Result of a successful event creation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to an event the calendar service created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLink {
    /// The provider-assigned event identifier.
    pub id: String,
    /// The calendar the event was inserted into.
    pub calendar_id: String,
    /// Browser URL of the event, when the provider returned one.
    pub html_link: Option<String>,
}

impl EventLink {
    /// Creates a new EventLink without a browser URL.
    pub fn new(id: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            html_link: None,
        }
    }

    /// Builder method to set the browser URL.
    pub fn with_html_link(mut self, url: impl Into<String>) -> Self {
        self.html_link = Some(url.into());
        self
    }
}

impl fmt::Display for EventLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.html_link {
            Some(ref url) => f.write_str(url),
            None => write!(f, "event {} in calendar {}", self.id, self.calendar_id),
        }
    }
}
