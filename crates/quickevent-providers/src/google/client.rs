//! Google Calendar API client.
//!
//! Only event insertion is needed: one `POST /calendars/{id}/events` per
//! submission, authenticated with the bearer token handed in by the caller.

use std::time::Duration;

use quickevent_core::EventLink;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::new_event::NewEvent;
use crate::provider::{BoxFuture, EventInserter};

use super::tokens::TokenInfo;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    calendar_id: String,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a client inserting into `calendar_id`.
    pub fn new(
        calendar_id: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            calendar_id: calendar_id.into(),
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// Inserts one event. A single attempt is made.
    pub async fn insert(&self, access_token: &str, event: &NewEvent) -> ProviderResult<EventLink> {
        let body = ApiEventInsert::from(event);
        debug!(
            "inserting event {:?} into calendar {} (repeating: {})",
            event.summary,
            self.calendar_id,
            event.is_repeating()
        );

        let response = self
            .http_client
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body));
        }

        let link = parse_inserted(&body, &self.calendar_id)?;
        info!("created event {} in calendar {}", link.id, self.calendar_id);
        Ok(link)
    }
}

impl EventInserter for GoogleCalendarClient {
    fn insert_event<'a>(
        &'a self,
        credential: &'a TokenInfo,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventLink>> {
        Box::pin(self.insert(&credential.access_token, event))
    }
}

/// Turns a rejected response into an error, preferring Google's own message.
fn rejection(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let message = match status {
        401 => format!("access token expired or invalid: {}", detail),
        403 => format!("access denied to calendar: {}", detail),
        _ => format!("API error ({}): {}", status, detail),
    };

    ProviderError::from_http_status(status, message).with_provider("google")
}

fn parse_inserted(body: &str, calendar_id: &str) -> ProviderResult<EventLink> {
    let inserted: ApiInsertedEvent = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
    })?;

    let link = EventLink::new(inserted.id, calendar_id);
    Ok(match inserted.html_link {
        Some(html_link) => link.with_html_link(html_link),
        None => link,
    })
}

// Google Calendar API wire types

/// Request body for `events.insert`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventInsert<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: ApiEventTime<'a>,
    end: ApiEventTime<'a>,
    /// Omitted for one-off events.
    #[serde(skip_serializing_if = "Option::is_none")]
    recurrence: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime<'a> {
    date_time: &'a str,
    time_zone: &'a str,
}

impl<'a> From<&'a NewEvent> for ApiEventInsert<'a> {
    fn from(event: &'a NewEvent) -> Self {
        Self {
            summary: &event.summary,
            description: event.description.as_deref(),
            start: ApiEventTime {
                date_time: &event.start,
                time_zone: &event.time_zone,
            },
            end: ApiEventTime {
                date_time: &event.end,
                time_zone: &event.time_zone,
            },
            recurrence: event
                .is_repeating()
                .then_some(event.recurrence.as_slice()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInsertedEvent {
    id: String,
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
