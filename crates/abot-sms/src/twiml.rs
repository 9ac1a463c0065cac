// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TwiML reply envelope and the inbound webhook form.

use serde::Deserialize;

/// Fields of Twilio's inbound message webhook that the core uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Wrap `reply` in a `<Response><Message>` envelope. An empty reply yields
/// an empty `<Response/>` so nothing is sent back.
pub fn envelope(reply: &str) -> String {
    if reply.is_empty() {
        return r#"<?xml version="1.0" encoding="UTF-8"?><Response/>"#.to_string();
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>{}</Message></Response>"#,
        escape(reply)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_escaped() {
        let xml = envelope("Tom & Jerry's <pizza>");
        assert!(xml.ends_with(
            "<Response><Message>Tom &amp; Jerry&apos;s &lt;pizza&gt;</Message></Response>"
        ));
    }

    #[test]
    fn empty_reply_sends_nothing() {
        assert!(envelope("").ends_with("<Response/>"));
    }

    #[test]
    fn webhook_form_parses() {
        let sms: InboundSms =
            serde_urlencoded::from_str("From=%2B13105550123&Body=Hi&MessageSid=SM1").unwrap();
        assert_eq!(sms.from, "+13105550123");
        assert_eq!(sms.body, "Hi");
    }
}
