// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin-side RPC server and registration with the core.
//!
//! A plugin binds an OS-assigned port, serves `POST /rpc` for its `Run` and
//! `FollowUp` methods, then announces itself to the core with
//! `Abot.RegisterPlugin`.

use std::sync::Arc;
use std::time::Duration;

use abot_core::rpc::{
    CORE_ADDR_ENV, REGISTER_METHOD, RPC_PATH, RegisterResponse, RpcRequest, RpcResponse,
    follow_up_method, run_method,
};
use abot_core::{AbotError, PluginDescriptor};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::plugin::Plugin;

const REGISTER_ATTEMPTS: u32 = 5;
const REGISTER_BACKOFF: Duration = Duration::from_millis(200);

/// Router answering the plugin's RPC methods.
pub fn rpc_router(plugin: Arc<Plugin>) -> Router {
    Router::new()
        .route(RPC_PATH, post(rpc_handler))
        .with_state(plugin)
}

async fn rpc_handler(
    State(plugin): State<Arc<Plugin>>,
    Json(req): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let first_contact = if req.method == run_method(plugin.name()) {
        true
    } else if req.method == follow_up_method(plugin.name()) {
        false
    } else {
        warn!(method = %req.method, "unknown rpc method");
        return Json(RpcResponse::err(
            req.id,
            format!("unknown method {}", req.method),
        ));
    };

    let params = match serde_json::from_value(req.params) {
        Ok(params) => params,
        Err(e) => return Json(RpcResponse::err(req.id, format!("invalid params: {e}"))),
    };
    debug!(method = %req.method, "handling call");
    let resp = plugin.handle(params, first_contact);
    match serde_json::to_value(resp) {
        Ok(result) => Json(RpcResponse::ok(req.id, result)),
        Err(e) => Json(RpcResponse::err(req.id, e.to_string())),
    }
}

/// Prefix a bare `host:port` with `http://`.
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", addr.trim_end_matches('/'))
    }
}

/// Core address passed down by the supervisor, if any.
pub fn core_addr_from_env() -> Option<String> {
    std::env::var(CORE_ADDR_ENV).ok().filter(|v| !v.is_empty())
}

/// Announce `descriptor` to the core, retrying while the core starts up.
pub async fn register(
    client: &reqwest::Client,
    core_addr: &str,
    descriptor: &PluginDescriptor,
) -> Result<RegisterResponse, AbotError> {
    let url = format!("{}{RPC_PATH}", normalize_addr(core_addr));
    let call = RpcRequest {
        method: REGISTER_METHOD.to_string(),
        params: serde_json::to_value(descriptor)?,
        id: 1,
    };

    let mut delay = REGISTER_BACKOFF;
    let mut attempt = 1;
    loop {
        match register_once(client, &url, &call).await {
            Ok(resp) => return Ok(resp),
            Err(e) if attempt < REGISTER_ATTEMPTS => {
                warn!(attempt, error = %e, "registration failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn register_once(
    client: &reqwest::Client,
    url: &str,
    call: &RpcRequest,
) -> Result<RegisterResponse, AbotError> {
    let resp: RpcResponse = client
        .post(url)
        .json(call)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AbotError::Rpc {
            message: format!("failed to reach core at {url}"),
            source: Some(Box::new(e)),
        })?
        .json()
        .await
        .map_err(|e| AbotError::Rpc {
            message: "invalid registration response".into(),
            source: Some(Box::new(e)),
        })?;

    if let Some(error) = resp.error {
        return Err(AbotError::Rpc {
            message: format!("core rejected registration: {error}"),
            source: None,
        });
    }
    match resp.result {
        Some(result) => Ok(serde_json::from_value(result)?),
        None => Ok(RegisterResponse::default()),
    }
}

/// Bind, register with the core and serve until `shutdown` fires.
pub async fn serve(
    plugin: Plugin,
    host: &str,
    core_addr: &str,
    shutdown: CancellationToken,
) -> Result<(), AbotError> {
    let bind = format!("{host}:0");
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| AbotError::Channel {
            message: format!("failed to bind plugin rpc to {bind}: {e}"),
            source: Some(Box::new(e)),
        })?;
    let local = listener.local_addr().map_err(|e| AbotError::Channel {
        message: format!("failed to read local address: {e}"),
        source: Some(Box::new(e)),
    })?;

    let mut descriptor = plugin.descriptor().clone();
    descriptor.rpc_address = format!("http://{local}");
    let name = descriptor.name.clone();

    let app = rpc_router(Arc::new(plugin));
    let token = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    });

    let client = reqwest::Client::new();
    let registered = register(&client, core_addr, &descriptor).await;
    let routes = match registered {
        Ok(resp) => resp.routes,
        Err(e) => {
            shutdown.cancel();
            return Err(e);
        }
    };
    info!(plugin = %name, addr = %local, routes = routes.len(), "plugin registered");

    server
        .await
        .map_err(|e| AbotError::Internal(format!("plugin server task failed: {e}")))?
        .map_err(|e| AbotError::Channel {
            message: format!("plugin server error: {e}"),
            source: Some(Box::new(e)),
        })
}
