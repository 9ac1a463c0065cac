// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound SMS driver.

use async_trait::async_trait;

use crate::error::AbotError;
use crate::traits::adapter::PluginAdapter;

/// Sends a text message to a phone number.
///
/// At most one SMS driver is active per process. Scheduled events addressed
/// to a phone are delivered through it.
#[async_trait]
pub trait SmsSender: PluginAdapter {
    /// Send `body` to `to` (E.164). Returns once the provider accepted it.
    async fn send(&self, to: &str, body: &str) -> Result<(), AbotError>;
}
