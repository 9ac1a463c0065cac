// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web chat authentication.
//!
//! A token is `base64url(header JSON) "." base64url(HMAC-SHA512(secret, header JSON))`
//! and is sent as `Authorization: Bearer <token>`. Tokens expire 72 hours
//! after issue. Passwords are stored as Argon2id PHC strings.

use std::sync::Arc;

use abot_core::{AbotError, User};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// How long an issued token stays valid, in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 72 * 60 * 60;

/// Signed claims carried by a token. Handlers behind the auth middleware
/// read it from the request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TokenHeader {
    #[serde(rename = "ID")]
    pub id: i64,
    pub email: String,
    pub scopes: Vec<String>,
    /// Unix seconds.
    pub issued_at: i64,
}

impl TokenHeader {
    pub fn for_user(user: &User, issued_at: i64) -> Self {
        let mut scopes = Vec::new();
        if user.admin {
            scopes.push("admin".to_string());
        }
        if user.trainer {
            scopes.push("trainer".to_string());
        }
        Self {
            id: user.id,
            email: user.email.clone(),
            scopes,
            issued_at,
        }
    }

    /// Web-session flex-id value for this login. Each issued token is its own
    /// session.
    pub fn session_id(&self) -> String {
        format!("{}-{}", self.id, self.issued_at)
    }
}

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl AuthConfig {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha512, AbotError> {
        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .map_err(|e| AbotError::Internal(format!("hmac key: {e}")))?;
        mac.update(payload);
        Ok(mac)
    }

    /// Issue a token for `user`.
    pub fn issue(&self, user: &User, now: i64) -> Result<(TokenHeader, String), AbotError> {
        let header = TokenHeader::for_user(user, now);
        let payload = serde_json::to_vec(&header)?;
        let sig = self.mac(&payload)?.finalize().into_bytes();
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig)
        );
        Ok((header, token))
    }

    /// Check signature and age of `token`.
    pub fn verify(&self, token: &str, now: i64) -> Result<TokenHeader, AbotError> {
        let (payload, sig) = token.split_once('.').ok_or(AbotError::Unauthorized)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AbotError::Unauthorized)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| AbotError::Unauthorized)?;
        self.mac(&payload)?
            .verify_slice(&sig)
            .map_err(|_| AbotError::Unauthorized)?;

        let header: TokenHeader =
            serde_json::from_slice(&payload).map_err(|_| AbotError::Unauthorized)?;
        if header.issued_at + TOKEN_LIFETIME_SECS < now {
            tracing::debug!(id = header.id, "token expired");
            return Err(AbotError::Unauthorized);
        }
        Ok(header)
    }
}

/// Middleware that requires a valid bearer token and attaches its
/// [`TokenHeader`] to the request.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        tracing::debug!("client did not send token");
        return Err(StatusCode::UNAUTHORIZED);
    };
    match auth.verify(bearer.token(), chrono::Utc::now().timestamp()) {
        Ok(header) => {
            request.extensions_mut().insert(header);
            Ok(next.run(request).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AbotError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| AbotError::Internal(format!("salt: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AbotError::Internal(format!("password hash: {e}")))
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            name: "Ann".into(),
            email: "ann@example.com".into(),
            admin: true,
            trainer: false,
        }
    }

    const NOW: i64 = 1_780_000_000;

    #[test]
    fn issued_tokens_verify() {
        let auth = AuthConfig::new("a-secret-that-is-long-enough-for-prod!!");
        let (header, token) = auth.issue(&user(), NOW).unwrap();
        assert_eq!(header.scopes, vec!["admin"]);
        assert_eq!(auth.verify(&token, NOW + 60).unwrap(), header);
    }

    #[test]
    fn tokens_expire_after_72_hours() {
        let auth = AuthConfig::new("secret");
        let (_, token) = auth.issue(&user(), NOW).unwrap();
        assert!(auth.verify(&token, NOW + 72 * 3600).is_ok());
        assert!(matches!(
            auth.verify(&token, NOW + 72 * 3600 + 1),
            Err(AbotError::Unauthorized)
        ));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let auth = AuthConfig::new("secret");
        let (_, token) = auth.issue(&user(), NOW).unwrap();
        assert!(AuthConfig::new("other").verify(&token, NOW).is_err());

        let (_, sig) = token.split_once('.').unwrap();
        let forged = TokenHeader {
            id: 1,
            ..TokenHeader::for_user(&user(), NOW)
        };
        let forged = format!(
            "{}.{sig}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap())
        );
        assert!(auth.verify(&forged, NOW).is_err());
        assert!(auth.verify("garbage", NOW).is_err());
    }

    #[test]
    fn header_uses_wire_field_names() {
        let json = serde_json::to_value(TokenHeader::for_user(&user(), NOW)).unwrap();
        assert_eq!(json["ID"], 7);
        assert_eq!(json["Email"], "ann@example.com");
        assert_eq!(json["IssuedAt"], NOW);
    }

    #[test]
    fn passwords_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not a phc string"));
    }

    #[test]
    fn auth_config_debug_redacts_secret() {
        let debug = format!("{:?}", AuthConfig::new("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
