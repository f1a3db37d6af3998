//! Configuration, the form controller and the `quickevent` CLI.
//!
//! The GTK frontend reuses [`ClientConfig`] and [`FormController`] from here.

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use controller::{FormController, StateObserver, SubmissionState};
pub use error::{ClientError, ClientResult};
