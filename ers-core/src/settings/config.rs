use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Plugin discovery and loading
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Trace log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginsConfig {
    /// Master switch for plugin discovery
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extra directories scanned after `~/.ers/plugins/`
    #[serde(default)]
    pub additional_dirs: Vec<PathBuf>,

    /// Plugins that are discovered but never loaded
    #[serde(default)]
    pub disabled_plugins: HashSet<String>,

    /// Allow loading shared libraries found through discovery
    #[serde(default = "default_true")]
    pub allow_native: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `ers_core=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Trace file; defaults to `~/.ers/trace/ers.log`
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            additional_dirs: Vec::new(),
            disabled_plugins: HashSet::new(),
            allow_native: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl PluginsConfig {
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_plugins.contains(name)
    }

    /// Disable a plugin by name. Returns false if it was already disabled.
    pub fn disable(&mut self, name: &str) -> bool {
        self.disabled_plugins.insert(name.to_string())
    }

    /// Re-enable a plugin by name. Returns false if it was not disabled.
    pub fn enable(&mut self, name: &str) -> bool {
        self.disabled_plugins.remove(name)
    }
}
