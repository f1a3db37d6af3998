use std::rc::Rc;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use gtk4 as gtk;
use gtk4::glib;
use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

use quickevent_client::{ClientError, FormController, SubmissionState};
use quickevent_core::{EventDraft, EventLink};

use crate::config::GtkConfig;
use crate::widgets::window::{UiWidgets, build as build_window};

const APP_ID: &str = "com.chmouel.quickevent";

/// Message shown above the event link on success.
const SUCCESS_TEXT: &str = "Event added to Google Calendar!";

#[derive(Debug)]
enum UiEvent {
    StateChanged(SubmissionState),
    Created(EventLink),
    Failed(String),
}

pub struct GtkApp {
    runtime: Arc<Runtime>,
    config: GtkConfig,
}

impl GtkApp {
    pub fn new(config: GtkConfig) -> Result<Self, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("failed to create runtime: {e}"))?;

        Ok(Self {
            runtime: Arc::new(runtime),
            config,
        })
    }

    pub fn run(self) -> glib::ExitCode {
        if let Err(e) = adw::init() {
            error!("failed to initialise libadwaita: {e}");
            return glib::ExitCode::FAILURE;
        }

        let app = adw::Application::builder().application_id(APP_ID).build();

        let runtime = self.runtime.clone();
        let config = self.config;

        app.connect_activate(move |app| {
            build_ui(app, runtime.clone(), &config);
        });

        app.run()
    }
}

/// Builds the form controller on first use.
///
/// Construction resolves the OAuth client secrets, so it only happens once a
/// complete draft is submitted. A failure is reported for that submission and
/// retried on the next one.
struct ControllerSlot {
    config: GtkConfig,
    ui_tx: mpsc::Sender<UiEvent>,
    controller: Mutex<Option<Arc<FormController>>>,
}

impl ControllerSlot {
    fn new(config: GtkConfig, ui_tx: mpsc::Sender<UiEvent>) -> Self {
        Self {
            config,
            ui_tx,
            controller: Mutex::new(None),
        }
    }

    fn get(&self) -> Result<Arc<FormController>, String> {
        let mut slot = self.controller.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref controller) = *slot {
            return Ok(controller.clone());
        }

        if let Some(ref err) = self.config.load_error {
            return Err(err.clone());
        }
        let ui_tx = self.ui_tx.clone();
        let controller = FormController::from_config(&self.config.client)
            .map_err(|e| e.to_string())?
            .with_observer(move |state| {
                let _ = ui_tx.send(UiEvent::StateChanged(state));
            });
        let controller = Arc::new(controller);
        *slot = Some(controller.clone());
        Ok(controller)
    }

    /// Validates `draft`, then hands it to the controller.
    async fn submit(&self, draft: EventDraft) -> Result<EventLink, String> {
        draft
            .validate()
            .map_err(|e| ClientError::from(e).to_string())?;
        let controller = self.get()?;
        controller.submit(draft).await.map_err(|e| e.to_string())
    }
}

fn build_ui(app: &adw::Application, runtime: Arc<Runtime>, config: &GtkConfig) {
    let widgets = Rc::new(build_window(app));

    let provider = gtk::CssProvider::new();
    provider.load_from_string(include_str!("../resources/style.css"));
    gtk::style_context_add_provider_for_display(
        &gtk4::prelude::RootExt::display(&widgets.window),
        &provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();

    if let Some(ref err) = config.load_error {
        warn!("configuration could not be loaded: {err}");
    }
    let slot = Arc::new(ControllerSlot::new(config.clone(), ui_tx.clone()));

    {
        let widgets_for_events = widgets.clone();

        glib::source::timeout_add_local(Duration::from_millis(100), move || {
            while let Ok(event) = ui_rx.try_recv() {
                match event {
                    UiEvent::StateChanged(state) => {
                        widgets_for_events.set_status(state.label(), state == SubmissionState::Failed);
                    }
                    UiEvent::Created(link) => {
                        widgets_for_events.set_busy(false);
                        widgets_for_events.set_status(SubmissionState::Succeeded.label(), false);
                        show_message(
                            &widgets_for_events.window,
                            "Success",
                            &format!("{SUCCESS_TEXT}\n\n{link}"),
                        );
                    }
                    UiEvent::Failed(err) => {
                        widgets_for_events.set_busy(false);
                        widgets_for_events.set_status(SubmissionState::Failed.label(), true);
                        show_message(&widgets_for_events.window, "Error", &err);
                    }
                }
            }

            glib::ControlFlow::Continue
        });
    }

    connect_submit(&widgets, runtime, slot, ui_tx);

    widgets.window.present();
}

fn connect_submit(
    widgets: &Rc<UiWidgets>,
    runtime: Arc<Runtime>,
    slot: Arc<ControllerSlot>,
    ui_tx: mpsc::Sender<UiEvent>,
) {
    let widgets_for_click = widgets.clone();
    widgets.submit_button.connect_clicked(move |_| {
        let draft = widgets_for_click.draft();
        widgets_for_click.set_busy(true);

        let slot = slot.clone();
        let ui_tx = ui_tx.clone();
        runtime.spawn(async move {
            let event = match slot.submit(draft).await {
                Ok(link) => {
                    info!("event created: {link}");
                    UiEvent::Created(link)
                }
                Err(e) => UiEvent::Failed(e),
            };
            let _ = ui_tx.send(event);
        });
    });
}

/// Shows a modal message over the form.
fn show_message(window: &adw::ApplicationWindow, heading: &str, body: &str) {
    let dialog = adw::AlertDialog::new(Some(heading), Some(body));
    dialog.add_response("close", "_Close");
    dialog.set_default_response(Some("close"));
    dialog.set_close_response("close");
    dialog.present(Some(window));
}
