//! Event drafts as collected from a form.
//!
//! An [`EventDraft`] holds exactly what the user typed. Nothing is parsed
//! here: dates and times stay strings and are only glued together by
//! [`compose_datetime`]. The calendar service is the one that rejects
//! malformed values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the date and the time part of a composed datetime.
pub const DATE_TIME_SEPARATOR: char = 'T';

/// Seconds suffix appended to every composed datetime.
pub const ZERO_SECONDS: &str = ":00";

/// A required field of an [`EventDraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Summary,
    StartDate,
    StartTime,
    EndDate,
    EndTime,
}

impl DraftField {
    /// All required fields, in form order.
    pub const REQUIRED: [DraftField; 5] = [
        Self::Summary,
        Self::StartDate,
        Self::StartTime,
        Self::EndDate,
        Self::EndTime,
    ];

    /// Returns the label shown to users for this field.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::StartDate => "start date",
            Self::StartTime => "start time",
            Self::EndDate => "end date",
            Self::EndTime => "end time",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised while checking a draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// One or more required fields are empty.
    #[error("missing field: {}", join_fields(.0))]
    MissingFields(Vec<DraftField>),
}

fn join_fields(fields: &[DraftField]) -> String {
    fields
        .iter()
        .map(DraftField::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The values of the event form at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title.
    pub summary: String,
    /// Start date, expected as `yyyy-mm-dd`.
    pub start_date: String,
    /// Start time, expected as `HH:MM`.
    pub start_time: String,
    /// End date, expected as `yyyy-mm-dd`.
    pub end_date: String,
    /// End time, expected as `HH:MM`.
    pub end_time: String,
    /// Repeat the event every week.
    #[serde(default)]
    pub repeating: bool,
    /// Free-form description; may be empty.
    #[serde(default)]
    pub description: String,
}

impl EventDraft {
    /// Creates a draft with the required fields set.
    pub fn new(
        summary: impl Into<String>,
        start_date: impl Into<String>,
        start_time: impl Into<String>,
        end_date: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start_date: start_date.into(),
            start_time: start_time.into(),
            end_date: end_date.into(),
            end_time: end_time.into(),
            repeating: false,
            description: String::new(),
        }
    }

    /// Builder method to mark the event as weekly recurring.
    pub fn with_repeating(mut self, repeating: bool) -> Self {
        self.repeating = repeating;
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the raw value of a required field.
    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Summary => &self.summary,
            DraftField::StartDate => &self.start_date,
            DraftField::StartTime => &self.start_time,
            DraftField::EndDate => &self.end_date,
            DraftField::EndTime => &self.end_time,
        }
    }

    /// Returns the required fields that are empty or whitespace only.
    pub fn missing_fields(&self) -> Vec<DraftField> {
        DraftField::REQUIRED
            .into_iter()
            .filter(|field| self.field(*field).trim().is_empty())
            .collect()
    }

    /// Checks that every required field is filled in.
    pub fn validate(&self) -> Result<(), DraftError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DraftError::MissingFields(missing))
        }
    }

    /// Returns the composed start datetime.
    pub fn start_datetime(&self) -> String {
        compose_datetime(&self.start_date, &self.start_time)
    }

    /// Returns the composed end datetime.
    pub fn end_datetime(&self) -> String {
        compose_datetime(&self.end_date, &self.end_time)
    }

    /// Returns the trimmed description, or `None` if it is blank.
    pub fn description(&self) -> Option<&str> {
        let description = self.description.trim();
        (!description.is_empty()).then_some(description)
    }
}

/// Joins a date and a clock time into a local datetime string.
///
/// `compose_datetime("2024-05-01", "14:30")` yields `"2024-05-01T14:30:00"`.
/// Surrounding whitespace is dropped, the values themselves are not checked.
pub fn compose_datetime(date: &str, time: &str) -> String {
    format!(
        "{}{}{}{}",
        date.trim(),
        DATE_TIME_SEPARATOR,
        time.trim(),
        ZERO_SECONDS
    )
}
