// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Abot core.

use thiserror::Error;

/// The primary error type used across the Abot workspace.
#[derive(Debug, Error)]
pub enum AbotError {
    /// Configuration errors (missing env var, invalid value, bad plugin entry).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (listener bind, SMS provider failure, malformed envelope).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Plugin RPC errors (dial failure, remote error, undecodable reply).
    #[error("rpc error: {message}")]
    Rpc {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No registered plugin claims the route.
    #[error("missing plugin for route `{route}`")]
    MissingPlugin { route: String },

    /// The caller sent a request the core cannot act on.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AbotError {
    /// Wrap any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AbotError::Storage {
            source: Box::new(err),
        }
    }

    /// True for errors caused by the caller rather than the core.
    pub fn is_user_error(&self) -> bool {
        matches!(self, AbotError::BadRequest(_) | AbotError::Unauthorized)
    }
}

impl From<serde_json::Error> for AbotError {
    fn from(err: serde_json::Error) -> Self {
        AbotError::Internal(format!("json: {err}"))
    }
}
