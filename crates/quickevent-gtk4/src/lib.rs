pub mod application;
pub mod config;
pub mod widgets;

pub use application::GtkApp;
pub use config::GtkConfig;
