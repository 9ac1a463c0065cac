// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and diagnostics.

use abot_config::diagnostic::ConfigError;
use abot_config::loader::load_config_from_str_with_env;
use abot_config::model::AbotConfig;
use abot_config::{load_and_validate_str, load_config_from_str};
use serial_test::serial;

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
base_url = "https://abot.example.com"
secret = "0123456789abcdef0123456789abcdef"
env = "production"
log_level = "debug"

[storage]
database_path = "/tmp/abot.db"
wal_mode = false

[nlp]
data_dir = "/usr/share/abot"
spell_depth = 1
spell_threshold = 10

[rpc]
call_timeout_secs = 5

[scheduler]
enabled = false
interval_secs = 30
queue_capacity = 16

[sms]
account_sid = "AC123"
auth_token = "tok"
from_number = "+15550001111"

[[plugins]]
name = "yelp"
command = "/usr/local/bin/abot-yelp"
args = ["--verbose"]
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert!(config.server.is_production());
    assert_eq!(config.storage.database_path, "/tmp/abot.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.nlp.spell_depth, 1);
    assert_eq!(config.rpc.call_timeout_secs, 5);
    assert!(!config.scheduler.enabled);
    assert_eq!(config.scheduler.queue_capacity, 16);
    assert!(config.sms.is_configured());
    assert_eq!(config.plugins.len(), 1);
    assert_eq!(config.plugins[0].args, vec!["--verbose"]);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.server.port, 4200);
    assert_eq!(config.server.env, "development");
    assert_eq!(config.nlp.spell_depth, 2);
    assert_eq!(config.nlp.spell_threshold, 4);
    assert_eq!(config.rpc.call_timeout_secs, 30);
    assert_eq!(config.scheduler.interval_secs, 60);
    assert!(!config.sms.is_configured());
    assert!(config.plugins.is_empty());
}

#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[server]
prot = 80
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key should fail");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, .. }
            if key == "prot" && suggestion.as_deref() == Some("port"))
    });
    assert!(found, "expected a `port` suggestion, got {errors:?}");
}

#[test]
fn unknown_top_level_section_rejected() {
    let err = load_config_from_str("[logging]\nlevel = \"debug\"\n")
        .expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(err_str.contains("unknown field") || err_str.contains("logging"));
}

#[test]
fn non_integer_port_is_a_type_error() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n")
        .expect_err("string port should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. }))
    );
}

#[test]
fn config_error_renders_with_miette() {
    let errors = load_and_validate_str("[server]\nprot = 80\n").unwrap_err();
    let handler = miette::GraphicalReportHandler::new();
    let mut out = String::new();
    handler.render_report(&mut out, &errors[0]).unwrap();
    assert!(out.contains("prot"));
}

#[test]
fn redacted_hides_secrets() {
    let mut config = AbotConfig::default();
    config.server.secret = "super-secret".into();
    config.sms.auth_token = Some("tok".into());
    let shown = serde_json::to_string(&config.redacted()).unwrap();
    assert!(!shown.contains("super-secret"));
    assert!(!shown.contains("\"tok\""));
}

#[test]
#[serial]
fn legacy_environment_variables_override_files() {
    // SAFETY: serialized with every other test that touches the environment.
    unsafe {
        std::env::set_var("PORT", "9911");
        std::env::set_var("ABOT_URL", "https://env.example.com");
        std::env::set_var("ABOT_DATABASE_URL", "/tmp/env.db");
        std::env::set_var("ABOT_CORE_ADDR", "127.0.0.1:1");
    }
    let result = load_config_from_str_with_env("[server]\nport = 1000\n");
    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("ABOT_URL");
        std::env::remove_var("ABOT_DATABASE_URL");
        std::env::remove_var("ABOT_CORE_ADDR");
    }

    let config = result.expect("env overrides should load");
    assert_eq!(config.server.port, 9911);
    assert_eq!(config.server.base_url, "https://env.example.com");
    assert_eq!(config.storage.database_path, "/tmp/env.db");
}

#[test]
#[serial]
fn section_environment_variables_override_files() {
    unsafe {
        std::env::set_var("ABOT_SCHEDULER_QUEUE_CAPACITY", "7");
        std::env::set_var("ABOT_SMS_API_BASE", "http://localhost:9");
    }
    let result = load_config_from_str_with_env("");
    unsafe {
        std::env::remove_var("ABOT_SCHEDULER_QUEUE_CAPACITY");
        std::env::remove_var("ABOT_SMS_API_BASE");
    }

    let config = result.expect("env overrides should load");
    assert_eq!(config.scheduler.queue_capacity, 7);
    assert_eq!(config.sms.api_base, "http://localhost:9");
}
