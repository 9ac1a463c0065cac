// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calling a registered plugin.

use abot_core::rpc::{PluginRequest, PluginResponse, follow_up_method, run_method};
use tracing::{debug, warn};

use crate::registry::RegisteredPlugin;

/// Call `Run` on first contact, `FollowUp` otherwise.
///
/// Failures are logged and come back as an empty response, which the core
/// treats as the plugin declining to answer.
pub async fn call(
    plugin: &RegisteredPlugin,
    req: &PluginRequest,
    first_contact: bool,
) -> PluginResponse {
    let method = if first_contact {
        run_method(plugin.name())
    } else {
        follow_up_method(plugin.name())
    };
    debug!(plugin = %plugin.name(), method = %method, "calling plugin");
    match plugin.client.call(&method, req).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(plugin = %plugin.name(), method = %method, error = %e, "plugin call failed");
            PluginResponse::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use abot_core::{Msg, PluginDescriptor};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::PluginClient;

    fn plugin(addr: &str) -> RegisteredPlugin {
        RegisteredPlugin {
            descriptor: PluginDescriptor {
                name: "yelp".into(),
                rpc_address: addr.into(),
                ..Default::default()
            },
            client: PluginClient::new(addr, Duration::from_secs(5)).unwrap(),
        }
    }

    fn request() -> PluginRequest {
        PluginRequest {
            msg: Msg::default(),
            memory: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn picks_method_by_first_contact() {
        let server = MockServer::start().await;
        for (name, reply) in [("Yelp.Run", "run"), ("Yelp.FollowUp", "follow")] {
            Mock::given(method("POST"))
                .and(body_partial_json(serde_json::json!({"method": name})))
                .respond_with(ResponseTemplate::new(200).set_body_json(
                    serde_json::json!({"id": 1, "result": {"reply": reply}}),
                ))
                .mount(&server)
                .await;
        }
        let p = plugin(&server.uri());
        assert_eq!(call(&p, &request(), true).await.reply, "run");
        assert_eq!(call(&p, &request(), false).await.reply, "follow");
    }

    #[tokio::test]
    async fn failures_become_empty_replies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let resp = call(&plugin(&server.uri()), &request(), true).await;
        assert_eq!(resp, PluginResponse::default());
    }
}
