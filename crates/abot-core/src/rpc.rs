// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire protocol between the core and out-of-process plugins.
//!
//! Both sides expose `POST /rpc` accepting a JSON-RPC style envelope. The
//! core serves `Abot.RegisterPlugin`; every plugin serves `<Name>.Run` and
//! `<Name>.FollowUp`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Msg, PluginDescriptor};

/// Method a plugin calls on the core to announce itself.
pub const REGISTER_METHOD: &str = "Abot.RegisterPlugin";

/// Path both sides serve their RPC endpoint on.
pub const RPC_PATH: &str = "/rpc";

/// Environment variable through which a plugin learns the core's address.
pub const CORE_ADDR_ENV: &str = "ABOT_CORE_ADDR";

/// Uppercase the first character of a plugin name.
pub fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `<Title(name)>.Run`
pub fn run_method(plugin: &str) -> String {
    format!("{}.Run", title(plugin))
}

/// `<Title(name)>.FollowUp`
pub fn follow_up_method(plugin: &str) -> String {
    format!("{}.FollowUp", title(plugin))
}

/// A single RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: u64,
}

/// The reply to an [`RpcRequest`]. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn ok(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Reply to `Abot.RegisterPlugin`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Routes now owned by the registering plugin.
    pub routes: Vec<String>,
}

/// Params of a `Run`/`FollowUp` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRequest {
    pub msg: Msg,
    /// Snapshot of the plugin's memory for the message owner.
    #[serde(default, with = "b64_map")]
    pub memory: BTreeMap<String, Vec<u8>>,
}

/// Memory changes made by a plugin during one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDelta {
    /// All of the plugin's memory for the owner was dropped before `set`.
    #[serde(default)]
    pub cleared: bool,
    #[serde(default, with = "b64_map")]
    pub set: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl MemoryDelta {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.set.is_empty() && self.deleted.is_empty()
    }
}

/// A plugin asking the core to send `content` to the message owner later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub content: String,
    /// `%Y-%m-%dT%H:%M:%S` in the core's local clock.
    pub send_at: chrono::NaiveDateTime,
}

/// Result of a `Run`/`FollowUp` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginResponse {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub memory: MemoryDelta,
    #[serde(default)]
    pub scheduled: Vec<ScheduleRequest>,
}

/// Params of `Abot.RegisterPlugin`.
pub type RegisterRequest = PluginDescriptor;

mod b64_map {
    use std::collections::BTreeMap;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(map: &BTreeMap<String, Vec<u8>>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: BTreeMap<&str, String> = map
            .iter()
            .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
            .collect();
        encoded.serialize(ser)
    }

    pub fn deserialize<'de, D>(de: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = BTreeMap::<String, String>::deserialize(de)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v.as_bytes())
                    .map(|bytes| (k, bytes))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}
