// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup: `./abot.toml` > `~/.config/abot/abot.toml` > `/etc/abot/abot.toml`,
//! then environment overrides.

#![allow(clippy::result_large_err)]

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AbotConfig;

/// Sections that accept `ABOT_<SECTION>_<KEY>` overrides.
const ENV_SECTIONS: &[&str] = &["server", "storage", "nlp", "rpc", "scheduler", "sms"];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/abot/abot.toml`
/// 3. `~/.config/abot/abot.toml`
/// 4. `./abot.toml`
/// 5. `PORT` and `ABOT_*` environment variables
pub fn load_config() -> Result<AbotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<AbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a TOML string with env var overrides applied.
pub fn load_config_from_str_with_env(toml_content: &str) -> Result<AbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AbotConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(port_provider())
        .merge(env_provider())
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AbotConfig::default()))
        .merge(Toml::file(path))
        .merge(port_provider())
        .merge(env_provider())
        .extract()
}

/// The Figment used for the default lookup, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AbotConfig::default()))
        .merge(Toml::file("/etc/abot/abot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("abot/abot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("abot.toml"))
        .merge(port_provider())
        .merge(env_provider())
}

/// Bare `PORT`, as set by most hosting platforms.
fn port_provider() -> Env {
    Env::raw()
        .only(&["PORT"])
        .map(|_| "server.port".into())
}

/// Map `ABOT_*` variables onto config paths.
///
/// Uses an explicit mapping instead of `Env::split("_")`: keys such as
/// `database_path` contain underscores. Variables that match no section are
/// dropped so unrelated `ABOT_*` variables cannot fail the load.
fn env_provider() -> Env {
    Env::prefixed("ABOT_")
        .filter(|key| map_env_key(key.as_str()).is_some())
        .map(|key| map_env_key(key.as_str()).unwrap_or_default().into())
}

/// `ABOT_` is already stripped from `key`.
pub(crate) fn map_env_key(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    let mapped = match key.as_str() {
        "url" => "server.base_url".to_string(),
        "secret" => "server.secret".to_string(),
        "env" => "server.env".to_string(),
        "database_url" => "storage.database_path".to_string(),
        other => {
            let section = ENV_SECTIONS
                .iter()
                .find(|s| other.starts_with(&format!("{s}_")))?;
            format!("{section}.{}", &other[section.len() + 1..])
        }
    };
    Some(mapped)
}
