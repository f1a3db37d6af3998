//! Provider-agnostic description of an event to create.

use quickevent_core::EventDraft;

/// Recurrence rule attached to repeating events.
pub const WEEKLY_RRULE: &str = "RRULE:FREQ=WEEKLY";

/// Timezone used when none is configured.
pub const DEFAULT_TIME_ZONE: &str = "Europe/Dublin";

/// An event ready to be sent to a calendar service.
///
/// Start and end are local datetimes (`yyyy-mm-ddTHH:MM:SS`) interpreted in
/// `time_zone`. They are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    /// IANA timezone both timestamps are pinned to.
    pub time_zone: String,
    /// RFC 5545 recurrence lines; empty for one-off events.
    pub recurrence: Vec<String>,
}

impl NewEvent {
    /// Creates a one-off event in the default timezone.
    pub fn new(
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            description: None,
            start: start.into(),
            end: end.into(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            recurrence: Vec::new(),
        }
    }

    /// Builds the event for a validated draft.
    pub fn from_draft(draft: &EventDraft, time_zone: impl Into<String>) -> Self {
        let mut event = Self::new(
            draft.summary.trim(),
            draft.start_datetime(),
            draft.end_datetime(),
        )
        .with_time_zone(time_zone)
        .with_repeating(draft.repeating);
        event.description = draft.description().map(str::to_string);
        event
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Adds or removes the weekly recurrence rule.
    pub fn with_repeating(mut self, repeating: bool) -> Self {
        self.recurrence.retain(|rule| rule != WEEKLY_RRULE);
        if repeating {
            self.recurrence.push(WEEKLY_RRULE.to_string());
        }
        self
    }

    pub fn is_repeating(&self) -> bool {
        !self.recurrence.is_empty()
    }
}
