//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use quickevent_core::EventDraft;

/// quickevent - Add events to Google Calendar
#[derive(Debug, Parser)]
#[command(name = "quickevent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "QUICKEVENT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an event
    Add(AddArgs),

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// The event form, as flags.
///
/// Values are taken verbatim; only emptiness is checked.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Event title
    #[arg(long, short)]
    pub summary: String,

    /// Start date (yyyy-mm-dd)
    #[arg(long)]
    pub start_date: String,

    /// Start time (HH:MM)
    #[arg(long)]
    pub start_time: String,

    /// End date (yyyy-mm-dd)
    #[arg(long)]
    pub end_date: String,

    /// End time (HH:MM)
    #[arg(long)]
    pub end_time: String,

    /// Repeat the event every week
    #[arg(long, short)]
    pub repeating: bool,

    /// Event description
    #[arg(long, short)]
    pub description: Option<String>,
}

impl AddArgs {
    pub fn to_draft(&self) -> EventDraft {
        EventDraft::new(
            &self.summary,
            &self.start_date,
            &self.start_time,
            &self.end_date,
            &self.end_time,
        )
        .with_repeating(self.repeating)
        .with_description(self.description.clone().unwrap_or_default())
    }
}

/// Authentication actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Authorize quickevent to write to Google Calendar
    Login {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID", requires = "client_secret")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET", requires = "client_id")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE", conflicts_with = "client_id")]
        credentials_file: Option<PathBuf>,

        /// Forget the cached credential and ask for consent again
        #[arg(long, short)]
        force: bool,
    },

    /// Show the cached credential state
    Status,

    /// Delete the cached credential
    Logout,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
