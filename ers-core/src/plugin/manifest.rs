//! Plugin manifest parsing (`ers-plugin.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE_NAME: &str = "ers-plugin.toml";

/// Native plugin manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (required)
    pub name: String,

    /// Plugin version (required)
    pub version: String,

    /// Plugin description (optional)
    pub description: Option<String>,

    /// Author information (optional)
    pub author: Option<PluginAuthor>,

    /// Path to the native library (relative to plugin root)
    pub library: String,

    /// ABI revision the plugin targets, for libraries that do not export
    /// `ers_plugin_abi_revision`
    pub abi_revision: Option<u32>,
}

/// Author information in a plugin manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginAuthor {
    pub name: String,
    pub email: Option<String>,
}

impl PluginManifest {
    /// Loads a manifest from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plugin manifest: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse plugin manifest: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;

        if manifest.name.trim().is_empty() {
            anyhow::bail!("Plugin name must not be empty");
        }
        if manifest.library.trim().is_empty() {
            anyhow::bail!("Plugin '{}' does not name a library", manifest.name);
        }

        Ok(manifest)
    }

    /// Returns the path to the manifest file given a plugin root directory.
    pub fn manifest_path(plugin_root: &Path) -> PathBuf {
        plugin_root.join(MANIFEST_FILE_NAME)
    }

    /// Resolves the library path against the plugin root.
    pub fn library_path(&self, plugin_root: &Path) -> PathBuf {
        plugin_root.join(self.library.trim_start_matches("./"))
    }
}
