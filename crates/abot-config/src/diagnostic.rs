// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports every problem it finds in one error; each becomes a
//! [`ConfigError`] that miette can render, pointing into `abot.toml` when the
//! offending key can be located.

#![allow(unused_assignments)] // generated by the miette Diagnostic derive

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Keys scoring below this Jaro-Winkler similarity are not suggested.
const MIN_SIMILARITY: f64 = 0.75;

/// A TOML file that took part in loading, kept for error spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlSource {
    pub path: String,
    pub content: String,
}

impl TomlSource {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// One configuration problem.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {section}")]
    #[diagnostic(code(abot::config::unknown_key), help("{}", unknown_key_help(suggestion.as_deref(), allowed)))]
    UnknownKey {
        key: String,
        /// `[server]`, `[sms]`, ... or `top level`.
        section: String,
        suggestion: Option<String>,
        allowed: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(abot::config::invalid_type), help("use a {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("`{key}` is required")]
    #[diagnostic(code(abot::config::missing_key), help("set `{key}` in abot.toml"))]
    MissingKey { key: String },

    /// Parsed, but not an acceptable value.
    #[error("{message}")]
    #[diagnostic(code(abot::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(abot::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, allowed: &str) -> String {
    match suggestion {
        Some(key) => format!("did you mean `{key}`? allowed here: {allowed}"),
        None => format!("allowed here: {allowed}"),
    }
}

fn dotted(path: &[String]) -> String {
    path.join(".")
}

/// Split a figment error into one diagnostic per problem.
pub fn figment_to_config_errors(err: figment::Error, sources: &[TomlSource]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(key, allowed) => unknown_key(&error, key, allowed, sources),
            Kind::MissingField(key) => {
                let mut path = error.path.clone();
                path.push(key.to_string());
                ConfigError::MissingKey { key: dotted(&path) }
            }
            Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                key: dotted(&error.path),
                detail: format!("found {found}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

fn unknown_key(
    error: &figment::Error,
    key: &str,
    allowed: &[&str],
    sources: &[TomlSource],
) -> ConfigError {
    let section = match error.path.first() {
        Some(table) => format!("[{table}]"),
        None => "top level".to_string(),
    };
    let located = source_of(error, sources).and_then(|source| {
        let offset = find_key_offset(&source.content, &error.path, key)?;
        Some((
            SourceSpan::new(offset.into(), key.len()),
            NamedSource::new(&source.path, source.content.clone()),
        ))
    });
    let (span, src) = located.unzip();
    ConfigError::UnknownKey {
        key: key.to_string(),
        section,
        suggestion: suggest_key(key, allowed),
        allowed: allowed.join(", "),
        span,
        src,
    }
}

/// The file an error came from. Inline strings carry no path, so with a
/// single source that one is assumed.
fn source_of<'a>(error: &figment::Error, sources: &'a [TomlSource]) -> Option<&'a TomlSource> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match file {
        Some(path) => sources.iter().find(|s| s.path == path),
        None if sources.len() == 1 => sources.first(),
        None => None,
    }
}

/// Byte offset of `key` within the table named by `path[0]` (or before the
/// first table header when `path` is empty). Comments are skipped.
pub fn find_key_offset(content: &str, path: &[String], key: &str) -> Option<usize> {
    let wanted = path.first().map(String::as_str);
    let mut table: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.trim_start_matches('[');
            table = name.split(']').next().map(str::trim);
            continue;
        }
        if table != wanted {
            continue;
        }
        let Some(rest) = trimmed.strip_prefix(key) else {
            continue;
        };
        if rest.trim_start().starts_with('=') {
            return Some(start + (line.len() - trimmed.len()));
        }
    }
    None
}

/// The allowed key closest to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, allowed: &[&str]) -> Option<String> {
    allowed
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr with miette's graphical renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_typos_get_a_suggestion() {
        let server = &["host", "port", "base_url", "secret", "env", "log_level"];
        assert_eq!(suggest_key("prot", server), Some("port".to_string()));
        let storage = &["database_path", "wal_mode"];
        assert_eq!(
            suggest_key("databse_path", storage),
            Some("database_path".to_string())
        );
    }

    #[test]
    fn unrelated_keys_get_none() {
        assert_eq!(suggest_key("zzzzzz", &["host", "port", "secret"]), None);
    }

    #[test]
    fn key_is_found_inside_its_table() {
        let content = "[storage]\nprot = 1\n\n[server]\n# prot = 2\nprot = 80\n";
        let o = find_key_offset(content, &["server".to_string()], "prot").unwrap();
        assert_eq!(&content[o..o + 8], "prot = 8");
    }

    #[test]
    fn key_in_another_table_is_not_found() {
        let content = "[storage]\nprot = 80\n";
        assert!(find_key_offset(content, &["server".to_string()], "prot").is_none());
    }

    #[test]
    fn top_level_keys_stop_at_the_first_table() {
        let content = "serverr = 1\n[server]\nport = 80\n";
        assert_eq!(find_key_offset(content, &[], "serverr"), Some(0));
        assert!(find_key_offset(content, &[], "port").is_none());
    }

    #[test]
    fn longer_keys_sharing_a_prefix_are_skipped() {
        let content = "[sms]\nauth_token_x = 1\nauth_token = 2\n";
        let o = find_key_offset(content, &["sms".to_string()], "auth_token").unwrap();
        assert_eq!(&content[o..], "auth_token = 2\n");
    }

    #[test]
    fn unknown_key_help_mentions_suggestion() {
        let help = unknown_key_help(Some("port"), "host, port");
        assert!(help.contains("did you mean `port`"));
        assert!(unknown_key_help(None, "host").starts_with("allowed here"));
    }
}
