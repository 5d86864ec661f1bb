// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! familiar: webhook dispatcher for merge-request coding agents.

mod envfile;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "familiar", version, about = "Webhook-driven merge-request agent dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dispatcher.
    Serve {
        /// Path to the YAML configuration file.
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
        /// Optional KEY=VALUE file loaded into the environment before
        /// the config is read.
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
    /// Print the version and exit.
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("familiar {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Serve { config, env_file } => serve(config, env_file),
    }
}

fn serve(config_path: PathBuf, env_file: Option<PathBuf>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Some(env_file) = env_file {
        envfile::load(&env_file)
            .with_context(|| format!("failed to load env file {}", env_file.display()))?;
    }

    // `${NAME}` references in the config see the env file's variables.
    let config = familiar_config::load_server_config(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(familiar_daemon::run(config)).context("dispatcher exited with an error")
}
