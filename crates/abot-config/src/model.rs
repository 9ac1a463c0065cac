// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so typos are caught at
//! startup instead of silently ignored.

use serde::{Deserialize, Serialize};

/// Accepted values for `server.env`.
pub const VALID_ENVS: &[&str] = &["production", "test", "development"];

/// Top-level Abot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AbotConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub nlp: NlpConfig,

    /// Plugin registration listener and call settings.
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Outbound SMS driver. Left empty, no SMS is sent.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Plugin executables spawned at boot.
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

impl AbotConfig {
    /// A copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.server.secret.is_empty() {
            copy.server.secret = "<redacted>".into();
        }
        if copy.sms.auth_token.is_some() {
            copy.sms.auth_token = Some("<redacted>".into());
        }
        copy
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URL the service is reachable at. Used in signup links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HMAC key for session tokens and plugin-facing signatures.
    #[serde(default)]
    pub secret: String,

    /// One of production, test, development.
    #[serde(default = "default_env")]
    pub env: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn is_test(&self) -> bool {
        self.env == "test"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
            secret: String::new(),
            env: default_env(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4200
}

fn default_base_url() -> String {
    "http://localhost:4200".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("abot").join("abot.db").display().to_string())
        .unwrap_or_else(|| "abot.db".to_string())
}

fn default_true() -> bool {
    true
}

/// Language pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NlpConfig {
    /// Directory holding the word lists and spelling corpora.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Maximum edit distance considered by the spell corrector.
    #[serde(default = "default_spell_depth")]
    pub spell_depth: usize,

    /// Minimum trained weight for a correction candidate.
    #[serde(default = "default_spell_threshold")]
    pub spell_threshold: u64,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            spell_depth: default_spell_depth(),
            spell_threshold: default_spell_threshold(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_spell_depth() -> usize {
    2
}

fn default_spell_threshold() -> u64 {
    4
}

/// Plugin RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Interface the registration listener binds to. The port is always
    /// assigned by the OS.
    #[serde(default = "default_host")]
    pub host: String,

    /// Deadline for a single Run/FollowUp call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    30
}

/// Scheduled-event loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Capacity of the channel between the ticker and the send worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    256
}

/// Twilio-compatible SMS driver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Reject inbound webhooks without a valid provider signature.
    #[serde(default = "default_true")]
    pub verify_signatures: bool,
}

impl SmsConfig {
    /// True when every credential needed to send is present.
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base: default_api_base(),
            verify_signatures: true,
        }
    }
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// A plugin executable the core launches at boot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginEntry {
    pub name: String,

    /// Executable path or name on `PATH`.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}
