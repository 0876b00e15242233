//! `tachyon-master` binary entrypoint.
//!
//! Mirrors `oxcrypt-cli/src/main.rs`'s shape: a `clap` CLI with a
//! verbosity-count flag, `tracing-subscriber` wired up from it, a
//! `fn main() -> ExitCode` delegating to a `run() -> anyhow::Result<()>`
//! inner function, and `anyhow::Context` for error messages. Does not
//! itself listen on a socket (`SPEC_FULL.md` §1 Non-goals) — it recovers
//! the master's state, starts the background threads, and blocks until
//! told to shut down.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tachyon_core::command_launcher::ShellCommandLauncher;
use tachyon_core::{CommandLauncher, MasterConfig, MasterHandle};

/// Metadata master for the Tachyon distributed in-memory file system
#[derive(Parser)]
#[command(name = "tachyon-master")]
#[command(author, version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Root directory for journal, logs, and the restart hook script
    #[arg(long, env = "TACHYON_HOME")]
    tachyon_home: Option<PathBuf>,

    /// Path to the write-ahead log (overrides TACHYON_HOME-derived default)
    #[arg(long, env = "MASTER_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Path to the checkpoint file (overrides TACHYON_HOME-derived default)
    #[arg(long, env = "MASTER_CHECKPOINT_FILE")]
    checkpoint_file: Option<PathBuf>,

    /// Run recovery and exit without starting the background threads
    #[arg(long)]
    recover_only: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut config = MasterConfig::from_env();
    if let Some(home) = cli.tachyon_home {
        config = config.tachyon_home(home);
    }
    if let Some(log_file) = cli.log_file {
        config = config.log_file(log_file);
    }
    if let Some(checkpoint_file) = cli.checkpoint_file {
        config = config.checkpoint_file(checkpoint_file);
    }

    std::fs::create_dir_all(&config.tachyon_home)
        .with_context(|| format!("failed to create {}", config.tachyon_home.display()))?;
    std::fs::create_dir_all(config.logs_dir())
        .with_context(|| format!("failed to create {}", config.logs_dir().display()))?;

    let launcher: Arc<dyn CommandLauncher> = Arc::new(ShellCommandLauncher::default());
    let handle = MasterHandle::recover(config, launcher).context("failed to recover master state from journal")?;

    if cli.recover_only {
        tracing::info!("recovery complete, exiting (--recover-only)");
        return Ok(());
    }

    handle.start_background();
    tracing::info!("tachyon-master running");

    wait_for_shutdown_signal()?;
    tracing::info!("shutdown signal received, stopping background threads");
    tracing::info!(metrics = %handle.metrics_snapshot().to_json(), "final metrics");
    handle.shutdown();

    Ok(())
}

/// Blocks the main thread until Ctrl-C, then returns. Grounded on
/// `oxcrypt-cli/src/commands/exec.rs`'s `ctrlc::set_handler` use for
/// interruptible foreground processes.
fn wait_for_shutdown_signal() -> Result<()> {
    let received = Arc::new(AtomicBool::new(false));
    let flag = received.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)).context("failed to install Ctrl-C handler")?;

    while !received.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
    Ok(())
}

/// Sets up tracing based on verbosity level, falling back to `RUST_LOG`
/// when set. Mirrors `oxcrypt-cli/src/main.rs`'s `setup_tracing`.
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();
}
