// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `X-Twilio-Signature` verification.
//!
//! The signature is base64(HMAC-SHA1(auth_token, url + sorted key/value
//! pairs of the POST form)).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

fn mac(auth_token: &str, url: &str, params: &[(String, String)]) -> Option<HmacSha1> {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(url.as_bytes());
    for (k, v) in sorted {
        mac.update(k.as_bytes());
        mac.update(v.as_bytes());
    }
    Some(mac)
}

/// Compute the signature Twilio would send for this request.
pub fn sign(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
    mac(auth_token, url, params)
        .map(|m| STANDARD.encode(m.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of `signature` against the request.
pub fn verify(auth_token: &str, url: &str, params: &[(String, String)], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    mac(auth_token, url, params).is_some_and(|m| m.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![
            ("From".into(), "+13105550123".into()),
            ("Body".into(), "Hi".into()),
        ]
    }

    #[test]
    fn sign_then_verify() {
        let url = "https://abot.example.com/sms";
        let sig = sign("token", url, &params());
        assert!(verify("token", url, &params(), &sig));
    }

    #[test]
    fn param_order_does_not_matter() {
        let url = "https://abot.example.com/sms";
        let mut reversed = params();
        reversed.reverse();
        assert_eq!(sign("token", url, &params()), sign("token", url, &reversed));
    }

    #[test]
    fn tampering_fails() {
        let url = "https://abot.example.com/sms";
        let sig = sign("token", url, &params());
        assert!(!verify("other", url, &params(), &sig));
        assert!(!verify("token", "https://evil/sms", &params(), &sig));
        assert!(!verify("token", url, &params(), "not base64!"));
    }
}
