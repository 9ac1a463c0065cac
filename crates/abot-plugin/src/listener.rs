// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The core's RPC endpoint, where plugins register.

use std::net::SocketAddr;
use std::sync::Arc;

use abot_core::rpc::{REGISTER_METHOD, RPC_PATH, RegisterResponse, RpcRequest, RpcResponse};
use abot_core::{AbotError, PluginDescriptor};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::registry::Registry;

/// Router serving `Abot.RegisterPlugin`.
pub fn rpc_router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route(RPC_PATH, post(rpc_handler))
        .with_state(registry)
}

async fn rpc_handler(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<RpcRequest>,
) -> Json<RpcResponse> {
    if req.method != REGISTER_METHOD {
        warn!(method = %req.method, "unknown rpc method");
        return Json(RpcResponse::err(
            req.id,
            format!("unknown method {}", req.method),
        ));
    }

    let descriptor: PluginDescriptor = match serde_json::from_value(req.params) {
        Ok(d) => d,
        Err(e) => return Json(RpcResponse::err(req.id, format!("invalid descriptor: {e}"))),
    };
    let name = descriptor.name.clone();
    match registry.register(descriptor).await {
        Ok(routes) => match serde_json::to_value(RegisterResponse { routes }) {
            Ok(result) => Json(RpcResponse::ok(req.id, result)),
            Err(e) => Json(RpcResponse::err(req.id, e.to_string())),
        },
        Err(e) => {
            warn!(plugin = %name, error = %e, "plugin registration rejected");
            Json(RpcResponse::err(req.id, e.to_string()))
        }
    }
}

/// Bind the RPC listener on an OS-assigned port.
pub async fn bind(host: &str) -> Result<(TcpListener, SocketAddr), AbotError> {
    let addr = format!("{host}:0");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AbotError::Channel {
            message: format!("failed to bind rpc listener to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;
    let local = listener.local_addr().map_err(|e| AbotError::Channel {
        message: format!("failed to read rpc listener address: {e}"),
        source: Some(Box::new(e)),
    })?;
    info!("rpc listener on {local}");
    Ok((listener, local))
}

/// Serve registrations until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
) -> Result<(), AbotError> {
    axum::serve(listener, rpc_router(registry))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AbotError::Channel {
            message: format!("rpc listener error: {e}"),
            source: Some(Box::new(e)),
        })
}
