// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound SMS through the Twilio Messages API.

use std::time::Duration;

use abot_config::model::SmsConfig;
use abot_core::{AbotError, AdapterType, HealthStatus, PluginAdapter, SmsSender};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize)]
struct MessageForm<'a> {
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
}

/// Twilio-backed [`SmsSender`].
#[derive(Clone)]
pub struct TwilioSender {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

impl std::fmt::Debug for TwilioSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioSender")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TwilioSender {
    /// Build from the `[sms]` section. Returns `Ok(None)` when the section
    /// leaves the driver unconfigured.
    pub fn from_config(config: &SmsConfig) -> Result<Option<Self>, AbotError> {
        let (Some(sid), Some(token), Some(from)) = (
            config.account_sid.as_ref(),
            config.auth_token.as_ref(),
            config.from_number.as_ref(),
        ) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AbotError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Some(Self {
            client,
            account_sid: sid.clone(),
            auth_token: token.clone(),
            from_number: from.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl PluginAdapter for TwilioSender {
    fn name(&self) -> &str {
        "twilio"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sms
    }

    async fn health_check(&self) -> Result<HealthStatus, AbotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AbotError> {
        Ok(())
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), AbotError> {
        let form = serde_urlencoded::to_string(MessageForm {
            to,
            from: &self.from_number,
            body,
        })
        .map_err(|e| AbotError::Internal(format!("failed to encode sms form: {e}")))?;

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form)
            .send()
            .await
            .map_err(|e| AbotError::Channel {
                message: format!("sms request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "sms provider rejected message");
            return Err(AbotError::Channel {
                message: format!("sms provider returned {status}"),
                source: None,
            });
        }
        debug!(to, "sms sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: &str) -> SmsConfig {
        SmsConfig {
            account_sid: Some("AC123".into()),
            auth_token: Some("secret".into()),
            from_number: Some("+15550000000".into()),
            api_base: api_base.into(),
            verify_signatures: true,
        }
    }

    #[test]
    fn unconfigured_is_none() {
        assert!(TwilioSender::from_config(&SmsConfig::default()).unwrap().is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let sender = TwilioSender::from_config(&config("http://x")).unwrap().unwrap();
        let debug = format!("{sender:?}");
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn posts_the_message_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=%2B13105550123"))
            .and(body_string_contains("Body=reminder"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sender = TwilioSender::from_config(&config(&server.uri())).unwrap().unwrap();
        sender.send("+13105550123", "reminder").await.unwrap();
    }

    #[tokio::test]
    async fn provider_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad number"))
            .mount(&server)
            .await;

        let sender = TwilioSender::from_config(&config(&server.uri())).unwrap().unwrap();
        assert!(sender.send("nope", "hi").await.is_err());
    }
}
