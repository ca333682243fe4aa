//! Lockbox shell - JSON command front end for credential archives
//!
//! Reads one command per line on stdin and answers on stdout.

mod config;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use lockbox_core::{KdbxProvider, Manager, Passphrase};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the passphrase for the startup archive.
const PASSPHRASE_VAR: &str = "LOCKBOX_PASSPHRASE";

/// Lockbox - serve a KeePass archive over a line-delimited JSON protocol
#[derive(Parser, Debug)]
#[command(name = "lockbox", author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the KeePass database file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    database: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout carries replies, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lockbox_shell=info".parse()?)
                .add_directive("lockbox_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Lockbox shell");

    // A .env file may supply the passphrase
    dotenvy::dotenv().ok();

    let mut config = config::Config::load(args.config)?;

    // Override database path if provided via CLI
    if let Some(database_path) = args.database {
        tracing::info!("Overriding database path from CLI: {}", database_path.display());
        config.database_path = Some(database_path);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let mut manager = Manager::new(KdbxProvider).with_search_limit(config.search_limit);

    if let Some(path) = &config.database_path {
        match std::env::var(PASSPHRASE_VAR) {
            Ok(passphrase) => {
                // A failed unlock is reported but the shell keeps serving
                if let Err(e) = runtime.block_on(manager.open(path, Passphrase::new(passphrase))) {
                    tracing::error!("Failed to unlock {}: {}", path.display(), e);
                }
            }
            Err(_) => tracing::info!(
                "{} not set; waiting for an open-workspace command for {}",
                PASSPHRASE_VAR,
                path.display()
            ),
        }
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    server::run(&runtime, &mut manager, stdin.lock(), stdout.lock())
}
