// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/JSON client for one plugin's RPC endpoint.
//!
//! Keeps at most one idle connection to the plugin and dials again on
//! demand, so a plugin that restarts on the same address is picked up
//! without re-registration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use abot_core::AbotError;
use abot_core::rpc::{PluginRequest, PluginResponse, RPC_PATH, RpcRequest, RpcResponse};

pub struct PluginClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

impl std::fmt::Debug for PluginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PluginClient {
    /// Client for the plugin serving at `rpc_address` (`http://host:port`).
    pub fn new(rpc_address: &str, timeout: Duration) -> Result<Self, AbotError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(1)
            .timeout(timeout)
            .build()
            .map_err(|e| AbotError::Rpc {
                message: "failed to build plugin client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            url: format!("{}{RPC_PATH}", rpc_address.trim_end_matches('/')),
            http,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` with `req` and decode the plugin's response.
    pub async fn call(
        &self,
        method: &str,
        req: &PluginRequest,
    ) -> Result<PluginResponse, AbotError> {
        let call = RpcRequest {
            method: method.to_string(),
            params: serde_json::to_value(req)?,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&call)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.transport_error(method, e))?;
        let resp: RpcResponse = resp
            .json()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        if let Some(error) = resp.error {
            return Err(AbotError::Rpc {
                message: format!("{method} failed: {error}"),
                source: None,
            });
        }
        match resp.result {
            Some(result) => Ok(serde_json::from_value(result)?),
            None => Ok(PluginResponse::default()),
        }
    }

    fn transport_error(&self, method: &str, e: reqwest::Error) -> AbotError {
        if e.is_timeout() {
            return AbotError::Timeout {
                duration: self.timeout,
            };
        }
        AbotError::Rpc {
            message: format!("{method} to {} failed", self.url),
            source: Some(Box::new(e)),
        }
    }
}
