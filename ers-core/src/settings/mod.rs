pub mod config;
pub mod manager;

pub use config::{LoggingConfig, PluginsConfig, Settings};
pub use manager::SettingsManager;
