//! The submission pipeline behind the form.
//!
//! A submission goes through
//! `Idle → Validating → Authenticating → Submitting → {Succeeded, Failed} → Idle`.
//! Nothing is retried; every error is returned to the caller as-is.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use quickevent_core::{EventDraft, EventLink};
use quickevent_providers::google::{GoogleAuthenticator, GoogleCalendarClient};
use quickevent_providers::{Authenticator, EventInserter, NewEvent};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Authenticating,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionState {
    /// Status line text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Validating => "Checking fields…",
            Self::Authenticating => "Waiting for Google authorization…",
            Self::Submitting => "Creating event…",
            Self::Succeeded => "Event created",
            Self::Failed => "Failed",
        }
    }

    /// Returns true while a submission is running.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Validating | Self::Authenticating | Self::Submitting
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Callback receiving every state transition.
pub type StateObserver = Box<dyn Fn(SubmissionState) + Send + Sync>;

/// Turns a filled-in form into a calendar event.
pub struct FormController {
    authenticator: Arc<dyn Authenticator>,
    inserter: Arc<dyn EventInserter>,
    time_zone: String,
    state: Mutex<SubmissionState>,
    observer: Option<StateObserver>,
}

impl FormController {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        inserter: Arc<dyn EventInserter>,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            authenticator,
            inserter,
            time_zone: time_zone.into(),
            state: Mutex::new(SubmissionState::Idle),
            observer: None,
        }
    }

    /// Wires the Google authenticator and calendar client from `config`.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let google = config.to_google_config()?;
        let client = GoogleCalendarClient::new(&google.calendar_id, google.timeout, &google.user_agent)
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let time_zone = google.time_zone.clone();
        let authenticator =
            GoogleAuthenticator::new(google).map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self::new(Arc::new(authenticator), Arc::new(client), time_zone))
    }

    pub fn with_observer(mut self, observer: impl Fn(SubmissionState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    fn transition(&self, next: SubmissionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
        debug!("submission state: {:?}", next);
        if let Some(ref observer) = self.observer {
            observer(next);
        }
    }

    /// Validates `draft`, obtains a credential and inserts the event.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Validation`] if a required field is empty; no
    ///   credential is requested and nothing is sent
    /// - [`ClientError::Auth`] if no credential could be obtained
    /// - [`ClientError::Api`] if the calendar service failed or refused the event
    pub async fn submit(&self, draft: EventDraft) -> ClientResult<EventLink> {
        self.transition(SubmissionState::Validating);

        let result = self.run(&draft).await;
        match result {
            Ok(ref link) => {
                info!("event created: {}", link);
                self.transition(SubmissionState::Succeeded);
            }
            Err(ref e) => {
                warn!("submission failed: {}", e);
                self.transition(SubmissionState::Failed);
            }
        }

        self.transition(SubmissionState::Idle);
        result
    }

    async fn run(&self, draft: &EventDraft) -> ClientResult<EventLink> {
        draft.validate()?;

        self.transition(SubmissionState::Authenticating);
        let credential = self
            .authenticator
            .obtain_credential()
            .await
            .map_err(ClientError::Auth)?;

        self.transition(SubmissionState::Submitting);
        let event = NewEvent::from_draft(draft, &self.time_zone);
        self.inserter
            .insert_event(&credential, &event)
            .await
            .map_err(ClientError::Api)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use quickevent_core::DraftField;
    use quickevent_providers::google::TokenInfo;
    use quickevent_providers::{AuthStatus, BoxFuture, ProviderError, ProviderResult, WEEKLY_RRULE};

    use super::*;

    #[derive(Default)]
    struct FakeAuthenticator {
        calls: StdMutex<u32>,
        deny: bool,
    }

    impl Authenticator for FakeAuthenticator {
        fn obtain_credential(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>> {
            Box::pin(async move {
                *self.calls.lock().unwrap() += 1;
                if self.deny {
                    return Err(ProviderError::authentication("authorization denied: access_denied"));
                }
                Ok(TokenInfo::new("token", None, Some(3600), vec![]))
            })
        }

        fn status(&self) -> AuthStatus {
            AuthStatus::default()
        }

        fn logout(&self) -> ProviderResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeInserter {
        sent: StdMutex<Vec<NewEvent>>,
        reject_with: Option<u16>,
    }

    impl FakeInserter {
        fn sent(&self) -> Vec<NewEvent> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl EventInserter for FakeInserter {
        fn insert_event<'a>(
            &'a self,
            credential: &'a TokenInfo,
            event: &'a NewEvent,
        ) -> BoxFuture<'a, ProviderResult<EventLink>> {
            Box::pin(async move {
                assert_eq!(credential.access_token, "token");
                self.sent.lock().unwrap().push(event.clone());
                if let Some(status) = self.reject_with {
                    return Err(ProviderError::from_http_status(status, "Bad Request: invalid start time"));
                }
                Ok(EventLink::new("evt1", "primary")
                    .with_html_link("https://www.google.com/calendar/event?eid=evt1"))
            })
        }
    }

    fn draft() -> EventDraft {
        EventDraft::new("Standup", "2024-05-01", "14:30", "2024-05-01", "15:00")
    }

    fn controller(
        auth: Arc<FakeAuthenticator>,
        inserter: Arc<FakeInserter>,
    ) -> (FormController, Arc<StdMutex<Vec<SubmissionState>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let controller = FormController::new(auth, inserter, "Europe/Dublin")
            .with_observer(move |state| sink.lock().unwrap().push(state));
        (controller, seen)
    }

    #[tokio::test]
    async fn successful_submission() {
        let auth = Arc::new(FakeAuthenticator::default());
        let inserter = Arc::new(FakeInserter::default());
        let (controller, seen) = controller(auth.clone(), inserter.clone());

        let link = controller.submit(draft()).await.unwrap();
        assert_eq!(link.id, "evt1");

        let sent = inserter.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].summary, "Standup");
        assert_eq!(sent[0].start, "2024-05-01T14:30:00");
        assert_eq!(sent[0].end, "2024-05-01T15:00:00");
        assert_eq!(sent[0].time_zone, "Europe/Dublin");
        assert!(sent[0].recurrence.is_empty());
        assert!(sent[0].description.is_none());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                SubmissionState::Validating,
                SubmissionState::Authenticating,
                SubmissionState::Submitting,
                SubmissionState::Succeeded,
                SubmissionState::Idle,
            ]
        );
        assert_eq!(controller.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn repeating_draft_carries_weekly_rule() {
        let auth = Arc::new(FakeAuthenticator::default());
        let inserter = Arc::new(FakeInserter::default());
        let (controller, _) = controller(auth, inserter.clone());

        controller
            .submit(draft().with_repeating(true).with_description("Weekly sync"))
            .await
            .unwrap();

        let sent = inserter.sent();
        assert_eq!(sent[0].recurrence, vec![WEEKLY_RRULE.to_string()]);
        assert_eq!(sent[0].description.as_deref(), Some("Weekly sync"));
    }

    #[tokio::test]
    async fn missing_field_stops_before_authentication() {
        let auth = Arc::new(FakeAuthenticator::default());
        let inserter = Arc::new(FakeInserter::default());
        let (controller, seen) = controller(auth.clone(), inserter.clone());

        let mut incomplete = draft();
        incomplete.start_time = "  ".to_string();
        let err = controller.submit(incomplete).await.unwrap_err();

        match err {
            ClientError::Validation(quickevent_core::DraftError::MissingFields(fields)) => {
                assert_eq!(fields, vec![DraftField::StartTime]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*auth.calls.lock().unwrap(), 0);
        assert!(inserter.sent().is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                SubmissionState::Validating,
                SubmissionState::Failed,
                SubmissionState::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn each_required_field_is_checked() {
        for field in DraftField::REQUIRED {
            let auth = Arc::new(FakeAuthenticator::default());
            let inserter = Arc::new(FakeInserter::default());
            let (controller, _) = controller(auth.clone(), inserter.clone());

            let mut incomplete = draft();
            match field {
                DraftField::Summary => incomplete.summary.clear(),
                DraftField::StartDate => incomplete.start_date.clear(),
                DraftField::StartTime => incomplete.start_time.clear(),
                DraftField::EndDate => incomplete.end_date.clear(),
                DraftField::EndTime => incomplete.end_time.clear(),
            }

            let err = controller.submit(incomplete).await.unwrap_err();
            assert!(matches!(err, ClientError::Validation(_)), "{field:?}");
            assert_eq!(*auth.calls.lock().unwrap(), 0);
            assert!(inserter.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn denied_consent_is_auth_error() {
        let auth = Arc::new(FakeAuthenticator {
            deny: true,
            ..Default::default()
        });
        let inserter = Arc::new(FakeInserter::default());
        let (controller, seen) = controller(auth, inserter.clone());

        let err = controller.submit(draft()).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
        assert!(err.to_string().contains("access_denied"));
        assert!(inserter.sent().is_empty());

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[seen.len() - 2..],
            [SubmissionState::Failed, SubmissionState::Idle]
        );
    }

    #[tokio::test]
    async fn rejected_event_is_api_error() {
        let auth = Arc::new(FakeAuthenticator::default());
        let inserter = Arc::new(FakeInserter {
            reject_with: Some(400),
            ..Default::default()
        });
        let (controller, seen) = controller(auth, inserter.clone());

        // malformed time goes through untouched and is refused remotely
        let err = controller
            .submit(EventDraft::new("Standup", "2024-05-01", "2pm", "2024-05-01", "3pm"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
        assert!(err.to_string().contains("invalid start time"));
        assert_eq!(inserter.sent()[0].start, "2024-05-01T2pm:00");

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                SubmissionState::Validating,
                SubmissionState::Authenticating,
                SubmissionState::Submitting,
                SubmissionState::Failed,
                SubmissionState::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn controller_is_reusable_after_failure() {
        let auth = Arc::new(FakeAuthenticator::default());
        let inserter = Arc::new(FakeInserter::default());
        let (controller, _) = controller(auth.clone(), inserter.clone());

        assert!(controller.submit(EventDraft::default()).await.is_err());
        assert!(controller.submit(draft()).await.is_ok());
        assert_eq!(*auth.calls.lock().unwrap(), 1);
    }

    #[test]
    fn busy_states() {
        assert!(!SubmissionState::Idle.is_busy());
        assert!(SubmissionState::Authenticating.is_busy());
        assert!(!SubmissionState::Failed.is_busy());
        assert_eq!(SubmissionState::Submitting.to_string(), "Creating event…");
    }
}
