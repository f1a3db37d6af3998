//! quickevent CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use quickevent_client::cli::{AuthAction, Cli, Command, ConfigAction};
use quickevent_client::commands;
use quickevent_client::commands::auth::LoginCredentials;
use quickevent_client::config::ClientConfig;
use quickevent_client::error::ClientResult;
use quickevent_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref());

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let tracing_config = if debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    let config_path = cli.config.unwrap_or_else(ClientConfig::default_path);

    match cli.command {
        Command::Add(args) => commands::add::run(&args, &config).await,
        Command::Auth { action } => match action {
            AuthAction::Login {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                let credentials = LoginCredentials {
                    client_id,
                    client_secret,
                    credentials_file,
                };
                commands::auth::login(credentials, force, &config, &config_path).await
            }
            AuthAction::Status => commands::auth::status(&config),
            AuthAction::Logout => commands::auth::logout(&config),
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
