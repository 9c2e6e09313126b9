//! Plugin system.
//!
//! Native plugins are discovered through `ers-plugin.toml` manifests or given
//! explicitly by library path.
//!
//! ## Plugin Discovery
//!
//! Plugins are discovered from multiple directories in priority order:
//! 1. `~/.ers/plugins/` (user-level, lowest priority)
//! 2. Additional configured directories
//! 3. `.ers/plugins/` in each workspace (project-level, highest priority)

pub mod api;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod native;
pub mod types;

pub use api::{EditorApi, HostHandle};
pub use discovery::{DiscoveredPlugin, PluginDiscovery};
pub use error::PluginError;
pub use manager::{LoadedPlugin, PluginManager};
pub use manifest::PluginManifest;
pub use types::{PluginInfo, PluginSource};
