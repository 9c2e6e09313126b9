//! Plugin manager for lifecycle and dispatch.
//!
//! The manager owns the editor and every plugin's table and registrations at
//! stable heap addresses, so the raw handles given to plugins stay valid until
//! the plugin is unloaded. Callbacks run synchronously on the caller's thread.

use std::path::Path;
use std::ptr::NonNull;

use tracing::{debug, info, warn};

use crate::editor::command::{parse_command, Command, CommandOutcome};
use crate::editor::Editor;

use super::api::EditorApi;
use super::discovery::DiscoveredPlugin;
use super::error::PluginError;
use super::native::abi::{Api, PluginInitFn, ABI_REVISION, LEGACY_ABI_REVISION};
use super::native::bridge::build_table;
use super::native::string_view::StringView;
use super::types::{PluginInfo, PluginMetadata, PluginRegistrations, PluginSource};

#[cfg(feature = "native-plugins")]
use super::native::loader::NativePluginLoader;

/// A plugin whose init has run.
pub struct LoadedPlugin {
    pub metadata: PluginMetadata,
    pub abi_revision: u32,
    table: NonNull<Api>,
    registrations: NonNull<PluginRegistrations>,
    // Declared last so the library is unloaded after the table is freed.
    #[cfg(feature = "native-plugins")]
    library: Option<libloading::Library>,
}

impl LoadedPlugin {
    fn new<E: EditorApi>(metadata: PluginMetadata, abi_revision: u32, editor: NonNull<E>) -> Self {
        let registrations = NonNull::from(Box::leak(Box::new(PluginRegistrations::new())));
        let table = NonNull::from(Box::leak(Box::new(build_table(
            editor.as_ptr(),
            registrations.as_ptr(),
        ))));

        Self {
            metadata,
            abi_revision,
            table,
            registrations,
            #[cfg(feature = "native-plugins")]
            library: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn registrations(&self) -> &PluginRegistrations {
        // SAFETY: owned by this plugin; only mutated from inside its callbacks,
        // which never overlap with a borrow of `self`.
        unsafe { self.registrations.as_ref() }
    }

    fn info(&self) -> PluginInfo {
        let registrations = self.registrations();
        PluginInfo {
            name: self.metadata.name.clone(),
            version: self.metadata.version.clone(),
            description: self.metadata.description.clone(),
            source: format!("{:?}", self.metadata.source),
            abi_revision: self.abi_revision,
            commands: registrations
                .commands()
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            render_hooks_count: registrations.render_hooks().len(),
        }
    }

    /// Refreshes the live flag and returns the table pointer for a callback.
    fn prepare_table(&self, in_status: bool) -> *mut Api {
        let table = self.table.as_ptr();
        // SAFETY: the table is owned by this plugin and no reference to it is
        // held across callbacks.
        unsafe { (*table).is_cursor_in_status = in_status };
        table
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        // SAFETY: both were leaked from boxes in `new` and are freed only here.
        unsafe {
            drop(Box::from_raw(self.table.as_ptr()));
            drop(Box::from_raw(self.registrations.as_ptr()));
        }
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("metadata", &self.metadata)
            .field("abi_revision", &self.abi_revision)
            .finish()
    }
}

/// Manages plugins throughout their lifecycle.
pub struct PluginManager<E: EditorApi> {
    editor: NonNull<E>,
    /// Load order; later plugins take precedence for command names
    plugins: Vec<LoadedPlugin>,
}

impl<E: EditorApi> PluginManager<E> {
    pub fn new(editor: E) -> Self {
        Self {
            editor: NonNull::from(Box::leak(Box::new(editor))),
            plugins: Vec::new(),
        }
    }

    pub fn editor(&self) -> &E {
        // SAFETY: owned by the manager; plugin code only reaches the editor
        // from callbacks, which require `&mut self`.
        unsafe { self.editor.as_ref() }
    }

    pub fn editor_mut(&mut self) -> &mut E {
        // SAFETY: as above.
        unsafe { self.editor.as_mut() }
    }

    /// Installs a plugin linked into the host binary.
    pub fn install_static(
        &mut self,
        name: &str,
        init: PluginInitFn,
        abi_revision: u32,
    ) -> Result<(), PluginError> {
        let abi_revision = resolve_revision(Some(abi_revision), None);
        self.check_new_plugin(name, abi_revision)?;
        let plugin = LoadedPlugin::new(
            PluginMetadata::new(name, PluginSource::Static),
            abi_revision,
            self.editor,
        );
        self.attach(plugin, init);
        Ok(())
    }

    /// Loads a shared library given by path and runs its init.
    ///
    /// The plugin is named after the library file (`libhello_plugin.so`
    /// becomes `hello_plugin`). Returns that name.
    #[cfg(feature = "native-plugins")]
    pub fn load_native(&mut self, path: &Path) -> Result<String, PluginError> {
        let name = library_plugin_name(path);
        let mut metadata =
            PluginMetadata::new(name.clone(), PluginSource::Explicit(path.to_path_buf()));
        metadata.library_path = Some(path.to_path_buf());
        self.load_library(metadata, path, None)?;
        Ok(name)
    }

    #[cfg(not(feature = "native-plugins"))]
    pub fn load_native(&mut self, path: &Path) -> Result<String, PluginError> {
        warn!("Cannot load {:?}: native plugin support is not enabled", path);
        Err(PluginError::NativeDisabled)
    }

    /// Loads a plugin found by discovery. Disabled plugins are skipped and
    /// reported as `Ok(false)`.
    pub fn load_discovered(&mut self, plugin: &DiscoveredPlugin) -> Result<bool, PluginError> {
        if !plugin.is_enabled() {
            debug!("Skipping disabled plugin '{}'", plugin.name());
            return Ok(false);
        }

        let manifest = &plugin.manifest;
        let mut metadata = PluginMetadata::new(manifest.name.clone(), plugin.source.clone());
        metadata.version = manifest.version.clone();
        metadata.description = manifest.description.clone().unwrap_or_default();
        metadata.library_path = Some(plugin.library_path());

        self.load_discovered_library(metadata, plugin, manifest.abi_revision)?;
        Ok(true)
    }

    #[cfg(feature = "native-plugins")]
    fn load_discovered_library(
        &mut self,
        metadata: PluginMetadata,
        plugin: &DiscoveredPlugin,
        manifest_revision: Option<u32>,
    ) -> Result<(), PluginError> {
        self.load_library(metadata, &plugin.library_path(), manifest_revision)
    }

    #[cfg(not(feature = "native-plugins"))]
    fn load_discovered_library(
        &mut self,
        _metadata: PluginMetadata,
        plugin: &DiscoveredPlugin,
        _manifest_revision: Option<u32>,
    ) -> Result<(), PluginError> {
        warn!(
            "Cannot load plugin '{}': native plugin support is not enabled",
            plugin.name()
        );
        Err(PluginError::NativeDisabled)
    }

    #[cfg(feature = "native-plugins")]
    fn load_library(
        &mut self,
        metadata: PluginMetadata,
        path: &Path,
        manifest_revision: Option<u32>,
    ) -> Result<(), PluginError> {
        if self.get_loaded(&metadata.name).is_some() {
            return Err(PluginError::AlreadyLoaded(metadata.name));
        }

        let library = NativePluginLoader::load(path)?;
        let abi_revision = resolve_revision(library.declared_revision, manifest_revision);
        self.check_new_plugin(&metadata.name, abi_revision)?;

        let init = library.init;
        let mut plugin = LoadedPlugin::new(metadata, abi_revision, self.editor);
        plugin.library = Some(library.library);
        self.attach(plugin, init);
        Ok(())
    }

    fn check_new_plugin(&self, name: &str, abi_revision: u32) -> Result<(), PluginError> {
        if self.get_loaded(name).is_some() {
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }

        if abi_revision > ABI_REVISION {
            warn!(
                "Rejecting plugin '{}': ABI revision {} is newer than {}",
                name, abi_revision, ABI_REVISION
            );
            return Err(PluginError::UnsupportedRevision {
                name: name.to_string(),
                plugin: abi_revision,
                host: ABI_REVISION,
            });
        }

        Ok(())
    }

    fn attach(&mut self, plugin: LoadedPlugin, init: PluginInitFn) {
        let table = plugin.prepare_table(self.editor().is_cursor_in_status());
        // SAFETY: every table function is populated and the handles stay
        // valid until the plugin is dropped.
        unsafe { init(table) };

        for registration in plugin.registrations().commands() {
            if let Some(owner) = self.command_owner(&registration.name) {
                info!(
                    "Command '{}' from plugin '{}' shadows the one from '{}'",
                    registration.name,
                    plugin.name(),
                    owner.name()
                );
            }
        }

        info!(
            "Loaded plugin '{}' (ABI revision {}, {} commands, {} render hooks)",
            plugin.name(),
            plugin.abi_revision,
            plugin.registrations().commands().len(),
            plugin.registrations().render_hooks().len()
        );
        self.plugins.push(plugin);
    }

    fn get_loaded(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// The plugin that currently answers to a command name.
    fn command_owner(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins
            .iter()
            .rev()
            .find(|p| p.registrations().command(name).is_some())
    }

    /// Runs a plugin command.
    ///
    /// A non-empty return value is copied out before this returns; an empty
    /// or null view means the command produced no output.
    pub fn run_command(
        &mut self,
        name: &str,
        args: &[&[u8]],
    ) -> Result<Option<Vec<u8>>, PluginError> {
        let in_status = self.editor().is_cursor_in_status();
        let Some(plugin) = self.command_owner(name) else {
            return Err(PluginError::UnknownCommand(name.to_string()));
        };
        let Some(registration) = plugin.registrations().command(name) else {
            return Err(PluginError::UnknownCommand(name.to_string()));
        };

        // Copied out: the callback may register more commands.
        let callback = registration.callback;
        let user_data = registration.user_data;
        let table = plugin.prepare_table(in_status);
        debug!("Running command '{}' from plugin '{}'", name, plugin.name());

        let views: Vec<StringView> = args.iter().map(|arg| StringView::from_bytes(arg)).collect();
        // SAFETY: the argument views outlive the call; the table is valid.
        let output = unsafe { callback(table, views.as_ptr(), views.len(), user_data) };

        if output.is_null() || output.is_empty() {
            return Ok(None);
        }
        // SAFETY: the plugin keeps the returned bytes alive until it is next
        // called; they are copied before that can happen.
        Ok(Some(unsafe { output.to_vec() }))
    }

    /// Invokes every render hook once: plugins in load order, hooks in
    /// registration order.
    pub fn render_frame(&mut self) {
        for index in 0..self.plugins.len() {
            let mut hook_index = 0;
            loop {
                let in_status = self.editor().is_cursor_in_status();
                let plugin = &self.plugins[index];
                // Re-read each time: a hook may register another one.
                let Some(hook) = plugin.registrations().render_hook(hook_index) else {
                    break;
                };
                let table = plugin.prepare_table(in_status);
                // SAFETY: the table is valid and user_data is the plugin's own.
                unsafe { (hook.callback)(table, hook.user_data) };
                hook_index += 1;
            }
        }
    }

    /// Unloads a plugin, releasing its registrations and library.
    pub fn unload(&mut self, name: &str) -> Result<(), PluginError> {
        let Some(position) = self.plugins.iter().position(|p| p.name() == name) else {
            return Err(PluginError::NotFound(name.to_string()));
        };
        let plugin = self.plugins.remove(position);
        info!("Unloaded plugin '{}'", plugin.name());
        Ok(())
    }

    /// Returns all loaded plugin names, in load order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.metadata.name.clone()).collect()
    }

    /// Returns every registered command name, sorted and deduplicated.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .iter()
            .flat_map(|p| p.registrations().commands().iter().map(|c| c.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.command_owner(name).is_some()
    }

    /// Gets a specific plugin by name.
    pub fn get_plugin(&self, name: &str) -> Option<PluginInfo> {
        self.get_loaded(name).map(LoadedPlugin::info)
    }

    /// Returns summary information for all loaded plugins.
    pub fn get_all_info(&self) -> Vec<PluginInfo> {
        self.plugins.iter().map(LoadedPlugin::info).collect()
    }

    pub fn count(&self) -> usize {
        self.plugins.len()
    }
}

impl PluginManager<Editor> {
    /// Executes a command line the way the status-bar prompt does.
    ///
    /// Built-in commands take precedence over plugin commands. Messages and
    /// errors are also written to the status line.
    pub fn execute(&mut self, line: &str) -> CommandOutcome {
        let outcome = match parse_command(line) {
            Command::Empty => CommandOutcome::Error("ERROR: empty command".to_string()),
            Command::Invalid(message) => CommandOutcome::Error(format!("ERROR: {message}")),
            Command::Quit => return CommandOutcome::Quit,
            Command::Load(path) => match self.editor_mut().load_file(Path::new(&path)) {
                Ok(()) => CommandOutcome::Message(format!("Successfully loaded file {path}")),
                Err(e) => CommandOutcome::Error(format!("ERROR: {e:#}")),
            },
            Command::Save(path) => {
                let editor = self.editor_mut();
                if let Some(path) = path {
                    editor.set_file_path(path.into());
                }
                match editor.save_file() {
                    Ok(path) => CommandOutcome::Message(format!(
                        "Successfully saved file to {}",
                        path.display()
                    )),
                    Err(e) => CommandOutcome::Error(format!("ERROR: {e:#}")),
                }
            }
            Command::Plugin { name, args } => {
                let args: Vec<&[u8]> = args.iter().map(|a| a.as_bytes()).collect();
                match self.run_command(&name, &args) {
                    Ok(None) => return CommandOutcome::Continue,
                    Ok(Some(output)) => return CommandOutcome::PluginOutput(output),
                    Err(PluginError::UnknownCommand(name)) => {
                        CommandOutcome::Error(format!("ERROR: unknown command: {name:?}"))
                    }
                    Err(e) => CommandOutcome::Error(format!("ERROR: {e}")),
                }
            }
        };

        match &outcome {
            CommandOutcome::Message(message) | CommandOutcome::Error(message) => {
                self.editor_mut().set_status(message.as_bytes());
            }
            _ => {}
        }
        outcome
    }
}

impl<E: EditorApi> Drop for PluginManager<E> {
    fn drop(&mut self) {
        // Plugins hold pointers to the editor, so they go first.
        self.plugins.clear();
        // SAFETY: leaked from a box in `new` and freed only here.
        unsafe { drop(Box::from_raw(self.editor.as_ptr())) };
    }
}

/// The revision a plugin is treated as: the one its library exports, else
/// the one its manifest declares, else revision 1. Zero counts as 1.
fn resolve_revision(declared: Option<u32>, manifest: Option<u32>) -> u32 {
    declared
        .or(manifest)
        .unwrap_or(LEGACY_ABI_REVISION)
        .max(LEGACY_ABI_REVISION)
}

#[cfg(feature = "native-plugins")]
/// Derives a plugin name from a library path: `libhello_plugin.so` becomes
/// `hello_plugin`.
fn library_plugin_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_prefix("lib") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => stem,
    }
}
