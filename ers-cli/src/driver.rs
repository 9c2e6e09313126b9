use anyhow::{Context, Result};
use ers_core::plugin::{PluginDiscovery, PluginInfo};
use ers_core::settings::PluginsConfig;
use ers_core::{CommandOutcome, Editor, EditorSnapshot, PluginManager};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct DriverConfig {
    pub file: Option<PathBuf>,
    pub plugins: Vec<PathBuf>,
    pub commands: Vec<String>,
    /// Frames rendered after all commands have run
    pub frames: u64,
    pub save: bool,
    pub workspace_roots: Vec<PathBuf>,
    pub home_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DriverReport {
    pub plugins: Vec<PluginInfo>,
    pub commands: Vec<CommandReport>,
    pub frames_rendered: u64,
    pub quit: bool,
    pub editor: EditorSnapshot,
}

impl DriverReport {
    pub fn has_errors(&self) -> bool {
        self.commands.iter().any(|c| c.kind == "error")
    }
}

/// Runs a scripted editor session: load a file and plugins, type each
/// command into the command prompt, and render frames in between.
pub struct Driver {
    manager: PluginManager<Editor>,
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Result<Self> {
        let mut editor = Editor::new();
        if let Some(file) = &config.file {
            if file.exists() {
                editor.load_file(file)?;
            } else {
                info!("{:?} does not exist yet; starting with an empty buffer", file);
                editor.set_file_path(file.clone());
            }
        }

        Ok(Self {
            manager: PluginManager::new(editor),
            config,
        })
    }

    pub fn manager_mut(&mut self) -> &mut PluginManager<Editor> {
        &mut self.manager
    }

    /// Loads discovered plugins, then the ones given explicitly.
    ///
    /// A discovered plugin that fails to load is logged and skipped; an
    /// explicit one is an error.
    pub fn load_plugins(&mut self, plugins_config: &PluginsConfig) -> Result<()> {
        let discovery = PluginDiscovery::new(
            &self.config.workspace_roots,
            &self.config.home_dir,
            plugins_config,
        );
        for plugin in discovery.discover() {
            if let Err(e) = self.manager.load_discovered(&plugin) {
                warn!("Failed to load plugin '{}': {}", plugin.name(), e);
            }
        }

        for path in &self.config.plugins {
            let name = self
                .manager
                .load_native(path)
                .with_context(|| format!("Failed to load plugin {}", path.display()))?;
            info!("Loaded plugin '{}' from {:?}", name, path);
        }

        Ok(())
    }

    pub fn run(mut self) -> Result<DriverReport> {
        let mut reports = Vec::new();
        let mut frames_rendered = 0;
        let mut quit = false;

        for line in std::mem::take(&mut self.config.commands) {
            let outcome = self.submit(&line);
            self.manager.render_frame();
            frames_rendered += 1;

            quit = outcome == CommandOutcome::Quit;
            reports.push(report(line, outcome));
            if quit {
                break;
            }
        }

        if !quit {
            for _ in 0..self.config.frames {
                self.manager.render_frame();
                frames_rendered += 1;
            }
        }

        if self.config.save {
            let path = self.manager.editor_mut().save_file()?;
            info!("Saved buffer to {:?}", path);
        }

        Ok(DriverReport {
            plugins: self.manager.get_all_info(),
            commands: reports,
            frames_rendered,
            quit,
            editor: self.manager.editor().snapshot(),
        })
    }

    /// Types a line into the command prompt and executes it.
    fn submit(&mut self, line: &str) -> CommandOutcome {
        let editor = self.manager.editor_mut();
        editor.open_command_prompt();
        editor.insert_bytes(line.as_bytes());
        let input = editor
            .take_prompt_input()
            .map(|(_, input)| input)
            .unwrap_or_default();

        info!("Executing command {:?}", input);
        self.manager.execute(&input)
    }
}

fn report(command: String, outcome: CommandOutcome) -> CommandReport {
    let (kind, text) = match outcome {
        CommandOutcome::Continue => ("continue", None),
        CommandOutcome::Quit => ("quit", None),
        CommandOutcome::Message(message) => ("message", Some(message)),
        CommandOutcome::PluginOutput(output) => (
            "plugin_output",
            Some(String::from_utf8_lossy(&output).into_owned()),
        ),
        CommandOutcome::Error(message) => ("error", Some(message)),
    };
    CommandReport {
        command,
        kind,
        text,
    }
}

/// Renders the report as plain text: the buffer, then one line per command
/// result and the status line.
pub fn format_text(report: &DriverReport) -> String {
    let mut out = report.editor.rows.join("\n");
    out.push('\n');
    for command in &report.commands {
        if let Some(text) = &command.text {
            out.push_str(&format!("[{}] {}: {}\n", command.kind, command.command, text));
        }
    }
    if !report.editor.status.is_empty() {
        out.push_str(&format!("[status] {}\n", report.editor.status));
    }
    out
}

pub fn canonicalize_workspace_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("Failed to canonicalize workspace root {}", root.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ers_core::plugin::native::abi::ABI_REVISION;
    use tempfile::TempDir;

    fn config(temp: &TempDir, file: Option<PathBuf>, commands: &[&str]) -> DriverConfig {
        DriverConfig {
            file,
            plugins: Vec::new(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            frames: 0,
            save: false,
            workspace_roots: Vec::new(),
            home_dir: temp.path().to_path_buf(),
        }
    }

    fn with_hello(driver: &mut Driver) {
        driver
            .manager_mut()
            .install_static("hello", hello_plugin::ers_plugin_init, ABI_REVISION)
            .unwrap();
    }

    #[test]
    fn test_hello_then_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("greeting.txt");
        std::fs::write(&path, "Say: \n").unwrap();

        let mut config = config(&temp, Some(path.clone()), &["hello"]);
        config.save = true;
        let mut driver = Driver::new(config).unwrap();
        with_hello(&mut driver);

        let report = driver.run().unwrap();
        assert!(!report.has_errors());
        assert_eq!(report.editor.rows, vec!["Say: Hello, World!"]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Say: Hello, World!\n"
        );
    }

    #[test]
    fn test_render_hook_sets_status_after_command() {
        let temp = TempDir::new().unwrap();
        let mut driver = Driver::new(config(&temp, None, &["hello"])).unwrap();
        with_hello(&mut driver);

        let report = driver.run().unwrap();
        assert_eq!(report.frames_rendered, 1);
        assert_eq!(report.editor.status, "Hello from hello-plugin!");
    }

    #[test]
    fn test_unknown_command_is_reported() {
        let temp = TempDir::new().unwrap();
        let driver = Driver::new(config(&temp, None, &["frobnicate"])).unwrap();

        let report = driver.run().unwrap();
        assert!(report.has_errors());
        assert_eq!(report.commands[0].kind, "error");
        assert_eq!(
            report.editor.status,
            "ERROR: unknown command: \"frobnicate\""
        );
    }

    #[test]
    fn test_quit_stops_processing() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp, None, &["quit", "hello"]);
        config.frames = 10;
        let mut driver = Driver::new(config).unwrap();
        with_hello(&mut driver);

        let report = driver.run().unwrap();
        assert!(report.quit);
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.frames_rendered, 1);
        assert_eq!(report.editor.rows, vec![""]);
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("new.txt");
        let mut config = config(&temp, Some(path.clone()), &[]);
        config.save = true;

        let report = Driver::new(config).unwrap().run().unwrap();
        assert_eq!(report.editor.file_path, Some(path.clone()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\n");
    }

    #[test]
    fn test_explicit_plugin_failure_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp, None, &[]);
        config.plugins = vec![temp.path().join("libmissing.so")];
        let mut driver = Driver::new(config).unwrap();

        let err = driver.load_plugins(&PluginsConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("libmissing.so"));
    }

    #[test]
    fn test_format_text() {
        let temp = TempDir::new().unwrap();
        let mut driver = Driver::new(config(&temp, None, &["hello", "nope"])).unwrap();
        with_hello(&mut driver);

        let text = format_text(&driver.run().unwrap());
        assert!(text.starts_with("Hello, World!\n"));
        assert!(text.contains("[error] nope: ERROR: unknown command: \"nope\""));
        assert!(text.contains("[status] ERROR: unknown command"));
    }
}
