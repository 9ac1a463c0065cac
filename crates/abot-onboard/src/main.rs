// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `abot-onboard`: serves the onboarding plugin and registers it with the
//! core. Spawned by `abot serve` for each `[[plugins]]` entry that names it.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Onboarding plugin for Abot.
#[derive(Parser, Debug)]
#[command(name = "abot-onboard", version, about, long_about = None)]
struct Cli {
    /// Address of the core's plugin listener.
    #[arg(long, env = abot_sdk::CORE_ADDR_ENV)]
    core_addr: String,

    /// Public URL of the core, used in signup links.
    #[arg(long, env = "ABOT_URL", default_value = "http://localhost:4200")]
    base_url: String,

    /// Interface to accept calls from the core on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("abot_onboard=info,abot_sdk=info,warn")),
        )
        .init();

    let plugin = match abot_onboard::plugin(cli.base_url) {
        Ok(plugin) => plugin,
        Err(e) => {
            eprintln!("abot-onboard: {e}");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        token.cancel();
    });

    if let Err(e) = abot_sdk::serve(plugin, &cli.host, &cli.core_addr, shutdown).await {
        tracing::error!(error = %e, "onboarding plugin stopped");
        std::process::exit(1);
    }
}
