// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `abot serve` command implementation.
//!
//! Opens the database, loads the language tables, starts the plugin RPC
//! listener and the configured plugin processes, then serves the HTTP
//! gateway until SIGINT/SIGTERM. The scheduled-event loop runs alongside
//! when enabled.

use std::sync::Arc;
use std::time::Duration;

use abot_agent::{Core, Scheduler, install_signal_handler};
use abot_config::model::AbotConfig;
use abot_core::{AbotError, SmsSender};
use abot_gateway::{GatewayState, ServerConfig, start_server};
use abot_nlp::Pipeline;
use abot_plugin::{Registry, Supervisor, listener};
use abot_sms::TwilioSender;
use abot_storage::Database;
use tracing::{info, warn};

/// Runs the `abot serve` command.
pub async fn run_serve(config: AbotConfig) -> Result<(), AbotError> {
    init_tracing(&config.server.log_level);
    info!(env = %config.server.env, "starting abot serve");

    let db = Database::from_config(&config.storage).await?;
    info!(path = %config.storage.database_path, "database ready");

    let nlp = Arc::new(Pipeline::load(&config.nlp)?);
    let registry = Arc::new(Registry::new(Duration::from_secs(
        config.rpc.call_timeout_secs,
    )));

    let sms: Option<Arc<dyn SmsSender>> = match TwilioSender::from_config(&config.sms)? {
        Some(sender) => {
            info!("sms driver configured");
            Some(Arc::new(sender))
        }
        None => {
            warn!("no sms driver configured, scheduled events will not be sent");
            None
        }
    };

    let cancel = install_signal_handler();

    let (rpc_listener, core_addr) = listener::bind(&config.rpc.host).await?;
    let rpc_task = tokio::spawn(listener::serve(
        rpc_listener,
        registry.clone(),
        cancel.clone(),
    ));

    let supervisor = Supervisor::spawn_all(&config.plugins, core_addr);
    info!(plugins = supervisor.len(), "plugin processes started");

    let scheduler_task = if config.scheduler.enabled {
        let scheduler = Scheduler::new(db.clone(), sms.clone(), &config.scheduler);
        Some(scheduler.spawn(cancel.clone()))
    } else {
        info!("scheduler disabled");
        None
    };

    let core = Core::new(db.clone(), nlp, registry, sms);
    let state = GatewayState::from_config(core, &config);
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = start_server(&server_config, state, cancel.clone()).await;
    // A gateway that failed to start must still take everything else down.
    cancel.cancel();

    if let Some(task) = scheduler_task {
        let _ = task.await;
    }
    match rpc_task.await {
        Ok(Err(e)) => warn!(error = %e, "rpc listener stopped with an error"),
        Err(e) => warn!(error = %e, "rpc listener task failed"),
        Ok(Ok(())) => {}
    }
    supervisor.shutdown().await;
    if let Err(e) = db.close().await {
        warn!(error = %e, "failed to close database cleanly");
    }

    served?;
    info!("abot serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("abot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
