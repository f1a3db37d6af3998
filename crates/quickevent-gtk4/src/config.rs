use std::path::PathBuf;

use quickevent_client::config::ClientConfig;

/// Environment variable pointing at an alternative `config.toml`.
const CONFIG_ENV: &str = "QUICKEVENT_CONFIG";

#[derive(Debug, Clone, Default)]
pub struct GtkConfig {
    pub client: ClientConfig,
    /// Why the configuration file could not be used, reported on submit.
    pub load_error: Option<String>,
}

impl GtkConfig {
    /// Loads `$QUICKEVENT_CONFIG` or the default `config.toml`.
    ///
    /// A broken file does not stop the window from opening; defaults are
    /// used and the error is kept for the first submission.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match ClientConfig::load(path.as_deref()) {
            Ok(client) => Self {
                client,
                load_error: None,
            },
            Err(e) => Self {
                client: ClientConfig::default(),
                load_error: Some(e.to_string()),
            },
        }
    }
}
