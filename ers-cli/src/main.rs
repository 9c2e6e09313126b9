use anyhow::{Context, Result};
use clap::Parser;
use ers_core::settings::{LoggingConfig, SettingsManager};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod driver;

use crate::driver::{Driver, DriverConfig};

#[derive(Parser, Debug)]
#[command(name = "ers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ers - headless editor driver for running plugins")]
struct Args {
    /// File to open
    file: Option<PathBuf>,

    /// Plugin library to load (repeatable)
    #[arg(long = "plugin", value_name = "PATH")]
    plugins: Vec<PathBuf>,

    /// Settings file (defaults to ~/.ers/settings.toml)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Command to run through the command prompt (repeatable, in order)
    #[arg(long = "exec", value_name = "CMD")]
    commands: Vec<String>,

    /// Render frames to run after the commands
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Save the buffer back to FILE when done
    #[arg(long)]
    save: bool,

    /// Workspace root searched for `.ers/plugins` (repeatable)
    #[arg(long = "workspace-root", value_name = "DIR")]
    workspace_roots: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings_manager = match &args.settings {
        Some(path) => SettingsManager::from_path(path.clone())?,
        None => SettingsManager::new()?,
    };
    let settings = settings_manager.settings();

    setup_tracing(&settings.logging)?;

    info!(
        "CLI startup: file={:?}, plugins={:?}, commands={}, frames={}, settings={:?}",
        args.file,
        args.plugins,
        args.commands.len(),
        args.frames,
        settings_manager.path()
    );

    if args.save && args.file.is_none() {
        return Err(anyhow::anyhow!("--save requires a FILE to be specified"));
    }

    let workspace_roots = if args.workspace_roots.is_empty() {
        vec![std::env::current_dir().context("Failed to get current directory")?]
    } else {
        args.workspace_roots
            .iter()
            .map(|root| driver::canonicalize_workspace_root(root))
            .collect::<Result<Vec<_>>>()?
    };
    let home_dir = dirs::home_dir().context("Failed to get home directory")?;

    let mut session = Driver::new(DriverConfig {
        file: args.file,
        plugins: args.plugins,
        commands: args.commands,
        frames: args.frames,
        save: args.save,
        workspace_roots,
        home_dir,
    })?;
    session.load_plugins(&settings.plugins)?;

    let report = session.run()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", driver::format_text(&report));
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn default_log_file() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".ers").join("trace").join("ers.log"))
}

fn setup_tracing(config: &LoggingConfig) -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let log_file = match &config.file {
        Some(file) => file.clone(),
        None => default_log_file()?,
    };
    if let Some(trace_dir) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(trace_dir)
            .with_context(|| format!("Failed to create trace directory {trace_dir:?}"))?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to open trace file {log_file:?}"))?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
