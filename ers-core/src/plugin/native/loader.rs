//! Native plugin loading using libloading.

use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use super::abi::{AbiRevisionFn, PluginInitFn, PLUGIN_INIT_SYMBOL, PLUGIN_REVISION_SYMBOL};
use crate::plugin::error::PluginError;

/// Handles loading native plugins from dynamic libraries.
pub struct NativePluginLoader;

impl NativePluginLoader {
    /// Loads a plugin library and resolves its entry points.
    ///
    /// The init entry point is not called here; that is the plugin manager's
    /// job once the table is ready.
    ///
    /// # Safety
    ///
    /// This function loads and executes code from external dynamic libraries
    /// (library constructors run on load). Only load plugins from trusted sources.
    pub fn load(library_path: &Path) -> Result<NativeLibrary, PluginError> {
        debug!("Loading native plugin from {:?}", library_path);

        let library = unsafe { Library::new(library_path) }.map_err(|source| PluginError::Open {
            path: library_path.to_path_buf(),
            source,
        })?;

        let init: PluginInitFn = unsafe {
            *library
                .get::<PluginInitFn>(PLUGIN_INIT_SYMBOL)
                .map_err(|_| PluginError::MissingEntryPoint(library_path.to_path_buf()))?
        };

        let declared_revision = unsafe {
            library
                .get::<AbiRevisionFn>(PLUGIN_REVISION_SYMBOL)
                .ok()
                .map(|revision| revision())
        };

        debug!(
            "Resolved entry points in {:?} (declared revision: {:?})",
            library_path, declared_revision
        );

        Ok(NativeLibrary {
            path: library_path.to_path_buf(),
            init,
            declared_revision,
            library,
        })
    }
}

/// An opened plugin library whose init has not run yet.
pub struct NativeLibrary {
    pub path: PathBuf,
    pub init: PluginInitFn,
    /// Revision reported by `ers_plugin_abi_revision`, if exported
    pub declared_revision: Option<u32>,
    /// Library handle; `init` is only valid while this is alive
    pub(crate) library: Library,
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("declared_revision", &self.declared_revision)
            .finish()
    }
}
