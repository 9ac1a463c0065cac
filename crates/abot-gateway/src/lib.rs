// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Abot core.
//!
//! Every transport adapter turns its input into a
//! [`Request`](abot_core::Request) and hands it to
//! [`Core::process_text`](abot_agent::Core::process_text):
//! JSON on `/`, Twilio webhooks on `/sms` and logged-in web chat on
//! `/api/chat`. Signup and login issue the bearer tokens web chat needs.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::{AuthConfig, TokenHeader};
pub use server::{GatewayState, HealthState, ServerConfig, SmsWebhook, router, start_server};
