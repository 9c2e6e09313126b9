//! Plugin system error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[cfg(feature = "native-plugins")]
    #[error("failed to open plugin library {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin library {} does not export ers_plugin_init", .0.display())]
    MissingEntryPoint(PathBuf),

    #[error("plugin '{name}' targets ABI revision {plugin}, host supports up to {host}")]
    UnsupportedRevision { name: String, plugin: u32, host: u32 },

    #[error("plugin already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("native plugin support is not enabled")]
    NativeDisabled,

    #[error("manifest error: {0:#}")]
    Manifest(anyhow::Error),
}
