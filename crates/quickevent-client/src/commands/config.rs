//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout, secrets masked.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", config_path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
///
/// Secret references are expanded and, when credentials come from a client
/// JSON file, that file is parsed too.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let google = config.to_google_config()?;
    google
        .credentials
        .resolve()
        .map_err(|e| ClientError::Config(e.message().to_string()))?;
    println!("Google credentials are valid.");

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_with_inline_credentials() {
        let config: ClientConfig = toml::from_str(
            "[google]\nclient_id = \"x.apps.googleusercontent.com\"\nclient_secret = \"s\"\n",
        )
        .unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn validate_missing_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.google.credentials_file = Some(dir.path().join("credentials.json"));

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn dump_serializes() {
        let mut config = ClientConfig::default();
        config.google.client_secret = Some("hunter2".to_string());
        assert!(dump(&config, Path::new("config.toml")).is_ok());
    }
}
