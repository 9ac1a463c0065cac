// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio SMS support: the outbound [`TwilioSender`], the TwiML reply
//! envelope and webhook signature checks.

pub mod sender;
pub mod signature;
pub mod twiml;

pub use sender::TwilioSender;
pub use twiml::{InboundSms, envelope};
