//! Plugin discovery from filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::settings::config::PluginsConfig;

use super::error::PluginError;
use super::manifest::PluginManifest;
use super::types::PluginSource;

/// A plugin directory with a valid manifest. Nothing has been loaded yet.
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    pub manifest: PluginManifest,
    pub source: PluginSource,
    /// Directory containing the manifest
    pub root_path: PathBuf,
    enabled: bool,
}

impl DiscoveredPlugin {
    /// Reads the manifest of a single plugin directory.
    pub fn from_dir(path: &Path, source: PluginSource) -> Result<Self, PluginError> {
        let manifest = PluginManifest::load(&PluginManifest::manifest_path(path))
            .map_err(PluginError::Manifest)?;
        Ok(Self {
            manifest,
            source,
            root_path: path.to_path_buf(),
            enabled: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn library_path(&self) -> PathBuf {
        self.manifest.library_path(&self.root_path)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Handles plugin discovery from multiple directories.
pub struct PluginDiscovery {
    config: PluginsConfig,
    workspace_roots: Vec<PathBuf>,
    home_dir: PathBuf,
}

impl PluginDiscovery {
    pub fn new(workspace_roots: &[PathBuf], home_dir: &Path, config: &PluginsConfig) -> Self {
        Self {
            config: config.clone(),
            workspace_roots: workspace_roots.to_vec(),
            home_dir: home_dir.to_path_buf(),
        }
    }

    /// Discovers all plugins from configured directories.
    ///
    /// Discovery order (later overrides earlier):
    /// 1. `~/.ers/plugins/` (user-level, lowest priority)
    /// 2. Additional configured directories
    /// 3. `.ers/plugins/` in each workspace (project-level, highest priority)
    ///
    /// The result is sorted by plugin name.
    pub fn discover(&self) -> Vec<DiscoveredPlugin> {
        let mut plugins = HashMap::new();

        if !self.config.enabled {
            debug!("Plugin system is disabled in config");
            return Vec::new();
        }

        let user_plugins_dir = self.home_dir.join(".ers").join("plugins");
        if user_plugins_dir.is_dir() {
            debug!("Discovering plugins from {:?}", user_plugins_dir);
            self.discover_from_directory(&user_plugins_dir, PluginSource::User, &mut plugins);
        }

        for dir in &self.config.additional_dirs {
            if dir.is_dir() {
                debug!("Discovering plugins from additional dir {:?}", dir);
                self.discover_from_directory(
                    dir,
                    PluginSource::Additional(dir.clone()),
                    &mut plugins,
                );
            }
        }

        for workspace_root in &self.workspace_roots {
            let project_plugins_dir = workspace_root.join(".ers").join("plugins");
            if project_plugins_dir.is_dir() {
                debug!(
                    "Discovering plugins from {:?} (workspace: {:?})",
                    project_plugins_dir, workspace_root
                );
                self.discover_from_directory(
                    &project_plugins_dir,
                    PluginSource::Project(workspace_root.clone()),
                    &mut plugins,
                );
            }
        }

        for name in &self.config.disabled_plugins {
            if let Some(plugin) = plugins.get_mut(name) {
                plugin.set_enabled(false);
                debug!("Plugin '{}' is disabled via config", name);
            }
        }

        let mut plugins: Vec<DiscoveredPlugin> = plugins.into_values().collect();
        plugins.sort_by(|a, b| a.name().cmp(b.name()));

        debug!("Discovered {} plugins", plugins.len());
        plugins
    }

    fn discover_from_directory(
        &self,
        dir: &Path,
        source: PluginSource,
        plugins: &mut HashMap<String, DiscoveredPlugin>,
    ) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read plugins directory {:?}: {}", dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            if !self.config.allow_native {
                debug!("Skipping {:?}: native plugins are not allowed", path);
                continue;
            }

            if let Some(plugin) = self.try_load_plugin(&path, &source) {
                let name = plugin.manifest.name.clone();
                if let Some(previous) = plugins.get(&name) {
                    debug!(
                        "Plugin '{}' at {:?} overrides {:?}",
                        name, path, previous.root_path
                    );
                }
                debug!("Discovered plugin '{}' at {:?}", name, path);
                plugins.insert(name, plugin);
            }
        }
    }

    fn try_load_plugin(&self, path: &Path, source: &PluginSource) -> Option<DiscoveredPlugin> {
        let manifest_path = PluginManifest::manifest_path(path);
        if !manifest_path.exists() {
            return None;
        }

        match DiscoveredPlugin::from_dir(path, source.clone()) {
            Ok(plugin) => Some(plugin),
            Err(e) => {
                warn!("Failed to load plugin manifest at {:?}: {}", manifest_path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_plugin(dir: &Path, name: &str, version: &str) {
        let plugin_dir = dir.join(name);
        fs::create_dir_all(&plugin_dir).unwrap();

        let manifest = format!(
            r#"
name = "{}"
version = "{}"
library = "libplugin.so"
"#,
            name, version
        );

        fs::write(plugin_dir.join("ers-plugin.toml"), manifest).unwrap();
    }

    fn user_plugins_dir(home: &Path) -> PathBuf {
        let dir = home.join(".ers").join("plugins");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_discover_user_plugins_sorted() {
        let temp = TempDir::new().unwrap();
        let plugins_dir = user_plugins_dir(temp.path());

        create_plugin(&plugins_dir, "zeta", "1.0.0");
        create_plugin(&plugins_dir, "alpha", "2.0.0");

        let config = PluginsConfig::default();
        let discovery = PluginDiscovery::new(&[], temp.path(), &config);
        let plugins = discovery.discover();

        let names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(plugins.iter().all(|p| p.source == PluginSource::User));
        assert_eq!(
            plugins[0].library_path(),
            plugins_dir.join("alpha").join("libplugin.so")
        );
    }

    #[test]
    fn test_skips_directories_without_manifest() {
        let temp = TempDir::new().unwrap();
        let plugins_dir = user_plugins_dir(temp.path());
        fs::create_dir_all(plugins_dir.join("not-a-plugin")).unwrap();
        fs::write(plugins_dir.join("stray-file"), "x").unwrap();

        let broken = plugins_dir.join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("ers-plugin.toml"), "name = ").unwrap();

        let config = PluginsConfig::default();
        let plugins = PluginDiscovery::new(&[], temp.path(), &config).discover();
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_from_dir_reports_manifest_error() {
        let temp = TempDir::new().unwrap();
        let err = DiscoveredPlugin::from_dir(temp.path(), PluginSource::User).unwrap_err();
        assert!(matches!(err, PluginError::Manifest(_)));
        assert!(err.to_string().contains("ers-plugin.toml"));
    }

    #[test]
    fn test_additional_dirs() {
        let temp = TempDir::new().unwrap();
        let extra = temp.path().join("extra");
        create_plugin(&extra, "extra-plugin", "0.1.0");

        let config = PluginsConfig {
            additional_dirs: vec![extra.clone()],
            ..Default::default()
        };
        let plugins = PluginDiscovery::new(&[], temp.path(), &config).discover();

        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].source, PluginSource::Additional(extra));
    }

    #[test]
    fn test_project_overrides_user() {
        let temp = TempDir::new().unwrap();

        let user_plugins = user_plugins_dir(temp.path());
        create_plugin(&user_plugins, "my-plugin", "1.0.0");

        let project_plugins = temp.path().join("project").join(".ers").join("plugins");
        fs::create_dir_all(&project_plugins).unwrap();
        create_plugin(&project_plugins, "my-plugin", "2.0.0");

        let config = PluginsConfig::default();
        let workspace_roots = vec![temp.path().join("project")];
        let discovery = PluginDiscovery::new(&workspace_roots, temp.path(), &config);
        let plugins = discovery.discover();

        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].manifest.version, "2.0.0");
        assert!(plugins[0].source.is_project_level());
    }

    #[test]
    fn test_disabled_plugins() {
        let temp = TempDir::new().unwrap();
        let plugins_dir = user_plugins_dir(temp.path());

        create_plugin(&plugins_dir, "enabled-plugin", "1.0.0");
        create_plugin(&plugins_dir, "disabled-plugin", "1.0.0");

        let mut config = PluginsConfig::default();
        config.disable("disabled-plugin");

        let plugins = PluginDiscovery::new(&[], temp.path(), &config).discover();

        assert_eq!(plugins.len(), 2);
        let find = |name: &str| plugins.iter().find(|p| p.name() == name).unwrap();
        assert!(find("enabled-plugin").is_enabled());
        assert!(!find("disabled-plugin").is_enabled());
    }

    #[test]
    fn test_native_plugins_not_allowed() {
        let temp = TempDir::new().unwrap();
        let plugins_dir = user_plugins_dir(temp.path());
        create_plugin(&plugins_dir, "native-plugin", "0.1.0");

        let config = PluginsConfig {
            allow_native: false,
            ..Default::default()
        };

        let plugins = PluginDiscovery::new(&[], temp.path(), &config).discover();
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_plugins_disabled_in_config() {
        let temp = TempDir::new().unwrap();
        let plugins_dir = user_plugins_dir(temp.path());
        create_plugin(&plugins_dir, "test-plugin", "1.0.0");

        let config = PluginsConfig {
            enabled: false,
            ..Default::default()
        };

        let plugins = PluginDiscovery::new(&[], temp.path(), &config).discover();
        assert!(plugins.is_empty());
    }
}
