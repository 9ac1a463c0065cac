// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Abot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - a complete core with temp storage and live plugin RPC
//! - [`MockPlugin`] - plugin with scripted replies that records every call
//! - [`MockSms`] - SMS driver that records instead of sending

pub mod harness;
pub mod mock_plugin;
pub mod mock_sms;

pub use harness::{TEST_BASE_URL, TestHarness, TestHarnessBuilder, default_word_lists};
pub use mock_plugin::{MockPlugin, RecordedCall};
pub use mock_sms::{MockSms, SentSms};
