// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording plugin served over the real RPC transport.
//!
//! `MockPlugin` answers `<Name>.Run` and `<Name>.FollowUp` with scripted
//! replies and keeps every call so tests can assert on what the core sent.

use std::collections::VecDeque;
use std::sync::Arc;

use abot_core::rpc::{
    PluginRequest, PluginResponse, RPC_PATH, RpcRequest, RpcResponse, follow_up_method,
    run_method,
};
use abot_core::{AbotError, PluginDescriptor, Trigger};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    /// True for `Run`, false for `FollowUp`.
    pub first_contact: bool,
    pub request: PluginRequest,
}

#[derive(Debug, Default)]
struct Inner {
    name: String,
    replies: Mutex<VecDeque<PluginResponse>>,
    fallback: String,
    calls: Mutex<Vec<RecordedCall>>,
}

/// A plugin whose replies are scripted by the test.
#[derive(Debug, Clone)]
pub struct MockPlugin {
    inner: Arc<Inner>,
    descriptor: PluginDescriptor,
}

impl MockPlugin {
    /// Describe a plugin claiming every `command_object` pair. Every call is
    /// answered with `fallback` unless a scripted response is queued.
    pub fn new(name: &str, commands: &[&str], objects: &[&str], fallback: &str) -> Self {
        let descriptor = PluginDescriptor {
            name: name.to_string(),
            maintainer: "tests".to_string(),
            trigger: Trigger {
                commands: commands.iter().map(|s| s.to_string()).collect(),
                objects: objects.iter().map(|s| s.to_string()).collect(),
                intents: Vec::new(),
            },
            ..Default::default()
        };
        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                fallback: fallback.to_string(),
                ..Default::default()
            }),
            descriptor,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queue a full response for the next call.
    pub async fn push_response(&self, resp: PluginResponse) {
        self.inner.replies.lock().await.push_back(resp);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.inner.calls.lock().await.len()
    }

    pub async fn last_call(&self) -> Option<RecordedCall> {
        self.inner.calls.lock().await.last().cloned()
    }

    /// Bind on an OS-assigned port and serve until `shutdown` fires.
    /// Returns the descriptor to register, with its address filled in.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<PluginDescriptor, AbotError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AbotError::Channel {
                message: format!("failed to bind mock plugin: {e}"),
                source: Some(Box::new(e)),
            })?;
        let local = listener.local_addr().map_err(|e| AbotError::Channel {
            message: format!("failed to read mock plugin address: {e}"),
            source: Some(Box::new(e)),
        })?;

        let app = Router::new()
            .route(RPC_PATH, post(rpc_handler))
            .with_state(self.inner.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
        });

        let mut descriptor = self.descriptor.clone();
        descriptor.rpc_address = format!("http://{local}");
        Ok(descriptor)
    }
}

async fn rpc_handler(
    State(inner): State<Arc<Inner>>,
    Json(req): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let first_contact = if req.method == run_method(&inner.name) {
        true
    } else if req.method == follow_up_method(&inner.name) {
        false
    } else {
        return Json(RpcResponse::err(req.id, format!("unknown method {}", req.method)));
    };
    let request: PluginRequest = match serde_json::from_value(req.params) {
        Ok(r) => r,
        Err(e) => return Json(RpcResponse::err(req.id, format!("invalid params: {e}"))),
    };

    inner.calls.lock().await.push(RecordedCall {
        method: req.method.clone(),
        first_contact,
        request,
    });
    let resp = inner
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| PluginResponse {
            reply: inner.fallback.clone(),
            ..Default::default()
        });
    match serde_json::to_value(resp) {
        Ok(result) => Json(RpcResponse::ok(req.id, result)),
        Err(e) => Json(RpcResponse::err(req.id, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abot_core::Msg;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn answers_run_and_records_the_call() {
        let mock = MockPlugin::new("yelp", &["find"], &["pizza"], "Here you go");
        let token = CancellationToken::new();
        let descriptor = mock.start(token.clone()).await.unwrap();
        assert!(descriptor.rpc_address.starts_with("http://127.0.0.1:"));

        let call = RpcRequest {
            method: "Yelp.Run".into(),
            params: serde_json::to_value(PluginRequest {
                msg: Msg {
                    sentence: "find pizza".into(),
                    ..Default::default()
                },
                memory: BTreeMap::new(),
            })
            .unwrap(),
            id: 3,
        };
        let resp: RpcResponse = reqwest::Client::new()
            .post(format!("{}{RPC_PATH}", descriptor.rpc_address))
            .json(&call)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let reply: PluginResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(reply.reply, "Here you go");

        let recorded = mock.last_call().await.unwrap();
        assert!(recorded.first_contact);
        assert_eq!(recorded.request.msg.sentence, "find pizza");
        token.cancel();
    }

    #[tokio::test]
    async fn scripted_responses_come_first() {
        let mock = MockPlugin::new("yelp", &["find"], &["pizza"], "fallback");
        mock.push_response(PluginResponse {
            reply: "scripted".into(),
            ..Default::default()
        })
        .await;
        let first = mock.inner.replies.lock().await.pop_front().unwrap();
        assert_eq!(first.reply, "scripted");
        assert_eq!(mock.call_count().await, 0);
    }
}
