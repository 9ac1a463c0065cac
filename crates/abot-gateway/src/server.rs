// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use abot_agent::Core;
use abot_config::model::AbotConfig;
use abot_core::AbotError;
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Health state for the unauthenticated health endpoint.
#[derive(Debug, Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
}

/// Inbound SMS webhook settings.
#[derive(Clone, Default)]
pub struct SmsWebhook {
    /// Provider auth token used to check signatures.
    pub auth_token: Option<String>,
    pub verify_signatures: bool,
    /// Public URL of `/sms` exactly as the provider calls it.
    pub webhook_url: String,
}

impl std::fmt::Debug for SmsWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsWebhook")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[redacted]"))
            .field("verify_signatures", &self.verify_signatures)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

impl SmsWebhook {
    /// The token to verify signatures with, when verification is on.
    pub fn verify_with(&self) -> Option<&str> {
        if self.verify_signatures {
            self.auth_token.as_deref()
        } else {
            None
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub core: Core,
    pub auth: AuthConfig,
    pub sms: SmsWebhook,
    pub health: HealthState,
}

impl GatewayState {
    /// Build the state from the loaded configuration.
    pub fn from_config(core: Core, config: &AbotConfig) -> Self {
        Self {
            core,
            auth: AuthConfig::new(&config.server.secret),
            sms: SmsWebhook {
                auth_token: config.sms.auth_token.clone(),
                verify_signatures: config.sms.verify_signatures,
                webhook_url: format!("{}/sms", config.server.base_url.trim_end_matches('/')),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        }
    }
}

/// Gateway listen address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the application router.
///
/// - POST /, POST /sms, POST /api/signup.json, POST /api/login.json,
///   GET /health: public
/// - POST /api/chat: bearer token
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/", post(handlers::post_index))
        .route("/sms", post(handlers::post_sms))
        .route("/health", get(handlers::get_health))
        .route("/api/signup.json", post(handlers::post_signup))
        .route("/api/login.json", post(handlers::post_login))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::post_chat))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the gateway listener.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, AbotError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| AbotError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Serve until `shutdown` is cancelled, letting in-flight requests finish.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), AbotError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway server listening on {addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AbotError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Bind and serve.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), AbotError> {
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_check_needs_token_and_flag() {
        let mut sms = SmsWebhook {
            auth_token: Some("tok".into()),
            verify_signatures: true,
            webhook_url: "http://localhost/sms".into(),
        };
        assert_eq!(sms.verify_with(), Some("tok"));
        sms.verify_signatures = false;
        assert_eq!(sms.verify_with(), None);
        assert_eq!(SmsWebhook::default().verify_with(), None);
    }

    #[test]
    fn sms_webhook_debug_redacts_token() {
        let sms = SmsWebhook {
            auth_token: Some("secret-token".into()),
            ..Default::default()
        };
        let debug = format!("{sms:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 4200,
        };
        assert!(format!("{config:?}").contains("127.0.0.1"));
    }
}
