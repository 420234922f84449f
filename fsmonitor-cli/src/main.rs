#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! Demonstration harness for `fsmonitor-core`: builds an in-memory index
//! from a directory, runs one operation against a hook or IPC oracle, and
//! prints the result.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fsmonitor_core::{IndexView, Mode};
use std::path::PathBuf;
use tracing::info;

mod config;
mod tree;

use config::load_config;

/// Command-line arguments for the `fsmonitor-cli` demonstration binary.
#[derive(Parser, Debug)]
#[command(name = "fsmonitor-cli", about = "Demonstration harness for fsmonitor-core")]
struct Cli {
    /// Verbosity level (0-2).
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Working-tree root to index.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Path to a TOML config file; omit to run with the feature disabled.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

/// Operations the harness can drive against an in-memory index.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run one refresh cycle and print the resulting clean/dirty entries.
    Refresh,
    /// Enable the feature: synthesize a token, mark everything dirty, refresh.
    Enable,
    /// Disable the feature: discard the stored token.
    Disable,
    /// Print the index and the bytes that would be persisted as the extension.
    Inspect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let raw_config = load_config(cli.config.as_deref())?;
    let (oracle_config, warning) = fsmonitor_core::config::load(&raw_config)?;
    if let Some(warning) = warning {
        tracing::warn!(%warning, "fsmonitor config warning");
    }

    let mut index = tree::build_index(&cli.root, oracle_config.mode != Mode::Disabled)?;
    let mut oracle = fsmonitor_core::OracleClient::new(
        oracle_config,
        fsmonitor_core::ipc::UnixSocketIpc::new(tree::socket_path_for(&cli.root)),
        fsmonitor_core::ipc::ShellHookSpawner::new(&cli.root),
    );

    match cli.command {
        Command::Refresh => {
            let outcome = fsmonitor_core::refresh(&mut index, &mut oracle);
            info!(?outcome, "refresh complete");
            report(&index);
        }
        Command::Enable => {
            fsmonitor_core::enable(&mut index, &mut oracle);
            report(&index);
        }
        Command::Disable => {
            fsmonitor_core::disable(&mut index);
            report(&index);
        }
        Command::Inspect => {
            report(&index);
            match fsmonitor_core::write_extension(&index) {
                Some(bytes) => println!("extension ({} bytes): {bytes:02x?}", bytes.len()),
                None => println!("extension: not written (no token stored)"),
            }
        }
    }

    Ok(())
}

fn report<T: IndexView>(index: &fsmonitor_core::Index<T>) {
    println!("token: {}", index.token.as_ref().map(fsmonitor_core::Token::as_str).unwrap_or("<none>"));
    println!("fsmonitor_changed: {}", index.fsmonitor_changed);
    for i in 0..index.entries.len() {
        let state = if index.entries.is_clean(i) { "CLEAN" } else { "DIRTY" };
        println!("  {state} {}", index.entries.path_at(i));
    }
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fsmonitor_core={level},fsmonitor_cli={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
