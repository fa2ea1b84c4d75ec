//! Layered settings loading.

mod builder;
mod env;
mod error;
mod settings;

pub use builder::SettingsBuilder;
pub use error::ConfigError;
pub use settings::Settings;
