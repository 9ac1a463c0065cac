// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abot - a conversational assistant core.
//!
//! This is the binary entry point for the Abot core.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use abot_config::model::AbotConfig;
use clap::{Parser, Subcommand};

mod serve;

/// Abot - a conversational assistant core.
#[derive(Parser, Debug)]
#[command(name = "abot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway, plugin listener and scheduler.
    Serve,
    /// Print the effective configuration with secrets masked.
    Config,
}

/// The effective configuration as TOML, secrets masked.
fn render_config(config: &AbotConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&config.redacted())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => abot_config::load_and_validate_path(path),
        None => abot_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            abot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("abot: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match render_config(&config) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("abot: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("abot: use --help for available commands");
        }
    }
}
