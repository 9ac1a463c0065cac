// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Abot core.
//!
//! TOML files layered with environment overrides, strict key checking
//! (`deny_unknown_fields`) and miette diagnostics with typo suggestions.
//!
//! ```no_run
//! use abot_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, TomlSource, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AbotConfig;

/// Load configuration from the standard lookup and validate it.
pub fn load_and_validate() -> Result<AbotConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from an explicit file and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<AbotConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![TomlSource::new(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<AbotConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![TomlSource::new("<inline>", toml_content)];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// The files the standard lookup reads, most specific first.
fn collect_toml_sources() -> Vec<TomlSource> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::current_dir() {
        candidates.push(dir.join("abot.toml"));
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("abot").join("abot.toml"));
    }
    candidates.push(std::path::PathBuf::from("/etc/abot/abot.toml"));

    candidates
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some(TomlSource::new(path.display().to_string(), content))
        })
        .collect()
}
