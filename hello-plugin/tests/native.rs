//! Loads the built shared library through the host's dynamic loader.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;

use ers_core::plugin::native::abi::ABI_REVISION;
use ers_core::plugin::{DiscoveredPlugin, PluginSource};
use ers_core::{CommandOutcome, Editor, PluginManager};
use hello_plugin::{MESSAGE, STATUS};
use tempfile::TempDir;

/// The cdylib cargo builds alongside this test binary.
fn library_path() -> PathBuf {
    let file = format!("{DLL_PREFIX}hello_plugin{DLL_SUFFIX}");
    let exe = std::env::current_exe().unwrap();
    let deps = exe.parent().unwrap();
    [deps.parent().unwrap(), deps]
        .iter()
        .map(|dir| dir.join(&file))
        .find(|path| path.exists())
        .unwrap_or_else(|| panic!("{file} not found near {}", deps.display()))
}

fn host_with(text: &str) -> PluginManager<Editor> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    PluginManager::new(Editor::from_text(text))
}

#[test]
fn test_load_native_reads_exported_revision() {
    let mut manager = host_with("abc");
    let name = manager.load_native(&library_path()).unwrap();
    assert_eq!(name, "hello_plugin");

    let info = manager.get_plugin(&name).unwrap();
    assert_eq!(info.abi_revision, ABI_REVISION);
    assert_eq!(info.commands, vec!["hello".to_string()]);
    assert_eq!(info.render_hooks_count, 1);

    assert_eq!(manager.execute("hello"), CommandOutcome::Continue);
    assert_eq!(manager.editor().row(0).unwrap(), [&b"abc"[..], MESSAGE].concat());

    manager.render_frame();
    assert_eq!(manager.editor().status(), STATUS);

    manager.unload(&name).unwrap();
    assert!(!manager.has_command("hello"));
}

#[test]
fn test_exported_revision_overrides_manifest() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("ers-plugin.toml"),
        format!(
            "name = \"hello\"\nversion = \"0.2.0\"\nlibrary = '{}'\nabi_revision = 1\n",
            library_path().display()
        ),
    )
    .unwrap();
    let plugin = DiscoveredPlugin::from_dir(temp.path(), PluginSource::User).unwrap();

    let mut manager = host_with("");
    assert!(manager.load_discovered(&plugin).unwrap());

    let info = manager.get_plugin("hello").unwrap();
    assert_eq!(info.abi_revision, ABI_REVISION);
    assert!(manager.has_command("hello"));
}
