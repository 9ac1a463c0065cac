// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types that only exist at the storage boundary.
//!
//! Shared domain types live in `abot-core`; these add the columns the rest
//! of the workspace does not need to see.

use abot_core::{FlexId, StructuredInput, User};
use serde::{Deserialize, Serialize};

pub use abot_core::types::{Owner, ScheduledEvent};

/// Input to signup.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// PHC-format hash; never the plaintext.
    pub password_hash: String,
    /// E.164 phone number, bound as a Phone flex-id.
    pub phone: Option<String>,
    pub admin: bool,
    pub trainer: bool,
}

/// A user together with its stored password hash, for login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A message row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: Option<i64>,
    pub flex_id: Option<FlexId>,
    pub sentence: String,
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
    pub structured_input: StructuredInput,
    pub plugin: String,
    pub route: String,
    pub abot_sent: bool,
    pub needs_training: bool,
    pub trained: bool,
    pub created_at: String,
}

/// Plugin and route of an earlier inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousRoute {
    pub plugin: String,
    pub route: String,
}

impl PreviousRoute {
    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }
}

/// Column values identifying the owner of a `states` or `messages` row.
///
/// User-owned rows use an empty flex-id and kind 0; flex-owned rows use
/// user id 0.
pub(crate) fn owner_columns(owner: &Owner) -> (i64, String, i64) {
    match owner {
        Owner::User(id) => (*id, String::new(), 0),
        Owner::Flex(flex) => (0, flex.value().to_string(), flex.kind().code()),
    }
}
