// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles POST /, POST /sms, POST /api/chat, POST /api/signup.json,
//! POST /api/login.json and GET /health.

use abot_core::{AbotError, FlexIdKind, HealthStatus, PluginAdapter, Request};
use abot_sms::signature::{self, SIGNATURE_HEADER};
use abot_sms::{InboundSms, envelope};
use abot_storage::NewUser;
use abot_storage::queries::users;
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::{TokenHeader, hash_password, verify_password};
use crate::server::GatewayState;

/// Generic text for errors the caller did not cause.
const INTERNAL_ERROR_MSG: &str = "Something went wrong.";
const INVALID_LOGIN_MSG: &str = "Invalid username/password combination";

/// Error body: `{"Msg": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Msg")]
    pub msg: String,
}

/// Maps [`AbotError`] onto status codes. Only caller errors are echoed back.
#[derive(Debug)]
pub struct ApiError(pub AbotError);

impl From<AbotError> for ApiError {
    fn from(err: AbotError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self.0 {
            AbotError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AbotError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            other => {
                error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MSG.to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { msg })).into_response()
    }
}

/// POST /
///
/// Processes one message and returns the reply as plain text.
pub async fn post_index(
    State(state): State<GatewayState>,
    Json(req): Json<Request>,
) -> Result<String, ApiError> {
    let turn = state.core.process_text(&req).await?;
    Ok(turn.reply)
}

/// POST /sms
///
/// Twilio inbound webhook. The sender's number becomes a Phone flex-id and
/// the reply is returned as TwiML.
pub async fn post_sms(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ApiError> {
    if let Some(token) = state.sms.verify_with() {
        let params: Vec<(String, String)> = serde_urlencoded::from_str(&body)
            .map_err(|e| AbotError::BadRequest(format!("malformed form: {e}")))?;
        let sig = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !signature::verify(token, &state.sms.webhook_url, &params, sig) {
            warn!("rejected SMS webhook with a bad signature");
            return Err(AbotError::Unauthorized.into());
        }
    }

    let sms: InboundSms = serde_urlencoded::from_str(&body)
        .map_err(|e| AbotError::BadRequest(format!("malformed form: {e}")))?;
    let req = Request {
        cmd: sms.body,
        flexid: Some(sms.from),
        flexidtype: Some(FlexIdKind::Phone.code()),
        ..Default::default()
    };
    let turn = state.core.process_text(&req).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        envelope(&turn.reply),
    )
        .into_response())
}

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub cmd: String,
}

/// Response body for POST /api/chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// POST /api/chat
///
/// Web chat for a logged-in user. The user id comes from the token, and the
/// token's session becomes the message's web-session flex-id.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Extension(token): Extension<TokenHeader>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let req = Request {
        cmd: body.cmd,
        uid: Some(token.id),
        flexid: Some(token.session_id()),
        flexidtype: Some(FlexIdKind::WebSession.code()),
    };
    let turn = state.core.process_text(&req).await?;
    Ok(Json(ChatResponse { reply: turn.reply }))
}

/// Request body for POST /api/signup.json.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Phone number to bind, E.164.
    #[serde(default, rename = "FID")]
    pub fid: String,
}

impl SignupRequest {
    fn validate(&self) -> Result<(), AbotError> {
        if self.name.trim().is_empty() {
            return Err(AbotError::BadRequest("You must enter a name.".into()));
        }
        if !self.email.contains('@') || !self.email.contains('.') {
            return Err(AbotError::BadRequest("You must enter a valid email.".into()));
        }
        if self.password.chars().count() < 8 {
            return Err(AbotError::BadRequest(
                "Your password must be at least 8 characters.".into(),
            ));
        }
        let fid = self.fid.trim();
        if !fid.is_empty() && !is_e164(fid) {
            return Err(AbotError::BadRequest(
                "Your phone number must be in international format, e.g. +13105551234.".into(),
            ));
        }
        Ok(())
    }
}

fn is_e164(number: &str) -> bool {
    number
        .strip_prefix('+')
        .is_some_and(|digits| {
            (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        })
}

/// Request body for POST /api/login.json.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response body for signup and login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionResponse {
    #[serde(rename = "ID")]
    pub id: i64,
    pub email: String,
    pub scopes: Vec<String>,
    pub auth_token: String,
    pub issued_at: i64,
}

impl SessionResponse {
    fn new(header: TokenHeader, auth_token: String) -> Self {
        Self {
            id: header.id,
            email: header.email,
            scopes: header.scopes,
            auth_token,
            issued_at: header.issued_at,
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, AbotError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AbotError::Internal(format!("blocking task failed: {e}")))
}

/// POST /api/signup.json
///
/// Creates the user, binds its email and phone, and logs it in.
pub async fn post_signup(
    State(state): State<GatewayState>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    body.validate()?;
    let password = body.password.clone();
    let password_hash = blocking(move || hash_password(&password)).await??;

    let fid = body.fid.trim();
    let new_user = NewUser {
        name: body.name.trim().to_string(),
        email: body.email.trim().to_string(),
        password_hash,
        phone: (!fid.is_empty()).then(|| fid.to_string()),
        admin: false,
        trainer: false,
    };
    let user = users::create_user(state.core.db(), &new_user).await?;
    info!(id = user.id, "user signed up");

    let (header, token) = state.auth.issue(&user, chrono::Utc::now().timestamp())?;
    Ok(Json(SessionResponse::new(header, token)))
}

/// POST /api/login.json
pub async fn post_login(
    State(state): State<GatewayState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Some(creds) = users::get_credentials(state.core.db(), body.email.trim()).await? else {
        debug!("login for unknown email");
        return Err(AbotError::BadRequest(INVALID_LOGIN_MSG.into()).into());
    };
    let password = body.password;
    let stored = creds.password_hash;
    if !blocking(move || verify_password(&password, &stored)).await? {
        debug!(id = creds.user.id, "login with wrong password");
        return Err(AbotError::BadRequest(INVALID_LOGIN_MSG.into()).into());
    }
    let (header, token) = state
        .auth
        .issue(&creds.user, chrono::Utc::now().timestamp())?;
    Ok(Json(SessionResponse::new(header, token)))
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database check fails.
    pub status: String,
    pub version: String,
    pub routes: usize,
    pub uptime_secs: u64,
    pub database: String,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let (status, database) = match state.core.db().health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", "healthy".to_string()),
        Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
            ("degraded", reason)
        }
        Err(e) => ("degraded", e.to_string()),
    };
    if status != "ok" {
        warn!(database = %database, "health check failed");
    }
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        routes: state.core.registry().len().await,
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        database,
    })
}
