// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `onboard` plugin.
//!
//! The core sends every message from an identity that is not bound to a
//! user here (`onboard_onboard`). The first message gets a full
//! introduction; anything after that gets a shorter reminder. Both carry a
//! signup link that pre-fills the sender's flex-id.

use abot_core::{AbotError, Msg, ONBOARD_PLUGIN};
use abot_sdk::{Plugin, State};

/// Introduction on first contact.
pub const GREETING: &str = "Hi, I'm Abot, your new personal assistant. To get started, please sign up here:";
/// Reminder for every later message.
pub const REMINDER: &str = "Hi, I'm Abot. To get started, you can sign up here:";

/// Signup page link for the sender of `msg`.
pub fn signup_url(base_url: &str, msg: &Msg) -> String {
    let base = base_url.trim_end_matches('/');
    let Some(flex) = &msg.flex_id else {
        return format!("{base}/signup");
    };
    let query = serde_urlencoded::to_string([("fid", flex.value())]).unwrap_or_default();
    format!("{base}/signup?{query}")
}

/// Build the plugin. `base_url` is the public URL of the core.
pub fn plugin(base_url: impl Into<String>) -> Result<Plugin, AbotError> {
    let base_url = base_url.into();
    let entry_url = base_url.clone();
    let greet = State::new()
        .on_entry(move |ctx| format!("{GREETING} {}", signup_url(&entry_url, &ctx.msg)))
        .complete(move |ctx| {
            (false, format!("{REMINDER} {}", signup_url(&base_url, &ctx.msg)))
        });

    Plugin::builder(ONBOARD_PLUGIN)
        .maintainer("abot")
        .commands(&["onboard"])
        .objects(&["onboard"])
        .states(vec![greet])
        .build()
}
