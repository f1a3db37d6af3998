use gtk4::glib;
use tracing::Level;

use quickevent_core::{TracingConfig, init_tracing};
use quickevent_gtk4::{GtkApp, GtkConfig};

fn main() -> glib::ExitCode {
    let config = GtkConfig::load();

    let tracing_config = if config.client.debug {
        TracingConfig::gui().with_level(Level::DEBUG)
    } else {
        TracingConfig::gui()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {e}");
    }

    match GtkApp::new(config) {
        Ok(app) => app.run(),
        Err(e) => {
            eprintln!("error: {e}");
            glib::ExitCode::FAILURE
        }
    }
}
