// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{AbotConfig, VALID_ENVS};

/// Minimum secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Validate a deserialized configuration. Collects every error.
pub fn validate_config(config: &AbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !config.server.base_url.starts_with("http") {
        fail(format!(
            "server.base_url `{}` must begin with http",
            config.server.base_url
        ));
    }

    if !VALID_ENVS.contains(&config.server.env.as_str()) {
        fail(format!(
            "server.env `{}` must be one of {}",
            config.server.env,
            VALID_ENVS.join(", ")
        ));
    }

    if config.server.is_production() && config.server.secret.len() < MIN_PRODUCTION_SECRET_LEN {
        fail(format!(
            "server.secret must be at least {MIN_PRODUCTION_SECRET_LEN} bytes in production"
        ));
    }

    if config.server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.nlp.data_dir.trim().is_empty() {
        fail("nlp.data_dir must not be empty".to_string());
    }

    if config.rpc.call_timeout_secs == 0 {
        fail("rpc.call_timeout_secs must be greater than 0".to_string());
    }

    if config.scheduler.interval_secs == 0 {
        fail("scheduler.interval_secs must be greater than 0".to_string());
    }

    if config.scheduler.queue_capacity == 0 {
        fail("scheduler.queue_capacity must be greater than 0".to_string());
    }

    let sms = &config.sms;
    let set = [
        sms.account_sid.is_some(),
        sms.auth_token.is_some(),
        sms.from_number.is_some(),
    ];
    if set.iter().any(|s| *s) && !set.iter().all(|s| *s) {
        fail(
            "sms.account_sid, sms.auth_token and sms.from_number must be set together"
                .to_string(),
        );
    }

    let mut seen = HashSet::new();
    for (i, plugin) in config.plugins.iter().enumerate() {
        if plugin.name.trim().is_empty() {
            fail(format!("plugins[{i}].name must not be empty"));
        } else if !seen.insert(plugin.name.as_str()) {
            fail(format!(
                "duplicate plugin name `{}` in [[plugins]] array",
                plugin.name
            ));
        }
        if plugin.command.trim().is_empty() {
            fail(format!("plugins[{i}].command must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
