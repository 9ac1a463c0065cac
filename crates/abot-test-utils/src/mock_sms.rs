// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS driver that records instead of sending.

use std::sync::atomic::{AtomicBool, Ordering};

use abot_core::{AbotError, AdapterType, HealthStatus, PluginAdapter, SmsSender};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub to: String,
    pub body: String,
}

/// Records every message passed to [`SmsSender::send`]. Can be switched to
/// fail, to exercise retry paths.
#[derive(Debug, Default)]
pub struct MockSms {
    sent: Mutex<Vec<SentSms>>,
    failing: AtomicBool,
}

impl MockSms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentSms> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockSms {
    fn name(&self) -> &str {
        "mock-sms"
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
impl SmsSender for MockSms {
    async fn send(&self, to: &str, body: &str) -> Result<(), AbotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AbotError::Channel {
                message: "mock sms failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(SentSms {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends() {
        let sms = MockSms::new();
        sms.send("+13105550123", "hello").await.unwrap();
        assert_eq!(
            sms.sent_messages().await,
            vec![SentSms {
                to: "+13105550123".into(),
                body: "hello".into()
            }]
        );
    }

    #[tokio::test]
    async fn failing_sends_are_not_recorded() {
        let sms = MockSms::new();
        sms.set_failing(true);
        assert!(sms.send("+13105550123", "hello").await.is_err());
        assert_eq!(sms.sent_count().await, 0);
    }
}
