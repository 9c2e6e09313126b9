//! Core types for the plugin system.

use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::path::PathBuf;

use super::native::abi::{CmdCallback, RenderCallback};

/// Represents the source/location where a plugin came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginSource {
    /// User-level plugin (`~/.ers/plugins/`)
    User,
    /// Project-level plugin (`.ers/plugins/` in a workspace root)
    Project(PathBuf),
    /// Additional configured directory
    Additional(PathBuf),
    /// Library path given explicitly (e.g. on the command line)
    Explicit(PathBuf),
    /// Linked into the host binary
    Static,
}

impl PluginSource {
    /// Returns true if this is a project-level plugin source.
    pub fn is_project_level(&self) -> bool {
        matches!(self, PluginSource::Project(_))
    }
}

/// Metadata about a loaded plugin.
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Plugin description
    pub description: String,
    /// Where the plugin was loaded from
    pub source: PluginSource,
    /// Path of the shared library, if any
    pub library_path: Option<PathBuf>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, source: PluginSource) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            description: String::new(),
            source,
            library_path: None,
        }
    }
}

/// A command registered by a plugin through `add_cmd`.
#[derive(Debug, Clone)]
pub struct CommandRegistration {
    pub name: String,
    pub callback: CmdCallback,
    pub user_data: *mut c_void,
}

/// A render hook registered by a plugin through `on_render`.
#[derive(Debug, Clone, Copy)]
pub struct RenderRegistration {
    pub callback: RenderCallback,
    pub user_data: *mut c_void,
}

/// Everything a single plugin registered with the host.
///
/// The host hands a pointer to this as the table's `plugin` handle. Entries
/// are kept in registration order and live until the plugin is unloaded.
#[derive(Debug, Default)]
pub struct PluginRegistrations {
    commands: Vec<CommandRegistration>,
    render_hooks: Vec<RenderRegistration>,
}

impl PluginRegistrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, registration: CommandRegistration) {
        self.commands.push(registration);
    }

    pub fn add_render_hook(&mut self, registration: RenderRegistration) {
        self.render_hooks.push(registration);
    }

    /// Looks up a command; the most recent registration of a name wins.
    pub fn command(&self, name: &str) -> Option<&CommandRegistration> {
        self.commands.iter().rev().find(|c| c.name == name)
    }

    pub fn commands(&self) -> &[CommandRegistration] {
        &self.commands
    }

    pub fn render_hooks(&self) -> &[RenderRegistration] {
        &self.render_hooks
    }

    pub fn render_hook(&self, index: usize) -> Option<RenderRegistration> {
        self.render_hooks.get(index).copied()
    }
}

/// Summary information about a loaded plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub source: String,
    pub abi_revision: u32,
    pub commands: Vec<String>,
    pub render_hooks_count: usize,
}
