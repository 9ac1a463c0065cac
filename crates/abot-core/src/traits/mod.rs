// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver traits.

pub mod adapter;
pub mod sms;

pub use adapter::PluginAdapter;
pub use sms::SmsSender;
