// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the core, its storage layer and plugins.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::AbotError;

/// Route reserved for identities that are not yet bound to a user.
pub const ONBOARD_ROUTE: &str = "onboard_onboard";

/// Name of the plugin that owns [`ONBOARD_ROUTE`].
pub const ONBOARD_PLUGIN: &str = "onboard";

/// Build the canonical route for a command/object pair.
pub fn route_for(command: &str, object: &str) -> String {
    format!("{}_{}", command.to_lowercase(), object.to_lowercase())
}

/// Transport a flex-id belongs to. The numeric codes are persisted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(try_from = "i64", into = "i64")]
pub enum FlexIdKind {
    Email,
    Phone,
    WebSession,
}

impl FlexIdKind {
    /// Persisted discriminator.
    pub fn code(self) -> i64 {
        match self {
            FlexIdKind::Email => 1,
            FlexIdKind::Phone => 2,
            FlexIdKind::WebSession => 3,
        }
    }
}

impl TryFrom<i64> for FlexIdKind {
    type Error = AbotError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FlexIdKind::Email),
            2 => Ok(FlexIdKind::Phone),
            3 => Ok(FlexIdKind::WebSession),
            other => Err(AbotError::BadRequest(format!(
                "unrecognized flexidtype {other}"
            ))),
        }
    }
}

impl From<FlexIdKind> for i64 {
    fn from(kind: FlexIdKind) -> Self {
        kind.code()
    }
}

/// A transport-scoped identity that may or may not be bound to a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FlexId {
    Email(String),
    Phone(String),
    WebSession(String),
}

impl FlexId {
    /// Build a flex-id from its persisted parts.
    pub fn from_parts(value: impl Into<String>, code: i64) -> Result<Self, AbotError> {
        let value = value.into();
        Ok(match FlexIdKind::try_from(code)? {
            FlexIdKind::Email => FlexId::Email(value),
            FlexIdKind::Phone => FlexId::Phone(value),
            FlexIdKind::WebSession => FlexId::WebSession(value),
        })
    }

    pub fn kind(&self) -> FlexIdKind {
        match self {
            FlexId::Email(_) => FlexIdKind::Email,
            FlexId::Phone(_) => FlexIdKind::Phone,
            FlexId::WebSession(_) => FlexIdKind::WebSession,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            FlexId::Email(v) | FlexId::Phone(v) | FlexId::WebSession(v) => v,
        }
    }
}

impl std::fmt::Display for FlexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// A registered user. The password hash never leaves the storage crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub trainer: bool,
}

/// Who a message, a memory or a context entry belongs to.
///
/// A bound user always wins over the transport identity it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    User(i64),
    Flex(FlexId),
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::User(id) => write!(f, "user:{id}"),
            Owner::Flex(flex) => write!(f, "{flex}"),
        }
    }
}

/// Sex of a person being discussed, used to resolve pronouns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Invalid,
    Male,
    Female,
    Either,
}

/// A human being mentioned in a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub sex: Sex,
}

/// Classifier output for a single inbound sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredInput {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub times: Vec<NaiveDateTime>,
    #[serde(default)]
    pub intents: Vec<String>,
}

impl StructuredInput {
    /// Candidate routes in routing order: commands outer, objects inner.
    pub fn candidate_routes(&self) -> Vec<String> {
        let mut routes = Vec::with_capacity(self.commands.len() * self.objects.len());
        for command in &self.commands {
            for object in &self.objects {
                routes.push(route_for(command, object));
            }
        }
        routes
    }
}

/// One inbound or outbound utterance as handed to plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub flex_id: Option<FlexId>,
    pub sentence: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub stems: Vec<String>,
    #[serde(default)]
    pub structured_input: StructuredInput,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub abot_sent: bool,
    #[serde(default)]
    pub needs_training: bool,
    #[serde(default)]
    pub trained: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Msg {
    /// The identity this message's state is keyed by.
    pub fn owner(&self) -> Option<Owner> {
        match (&self.user, &self.flex_id) {
            (Some(user), _) => Some(Owner::User(user.id)),
            (None, Some(flex)) => Some(Owner::Flex(flex.clone())),
            (None, None) => None,
        }
    }
}

/// Uniform inbound request produced by every transport adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub uid: Option<i64>,
    #[serde(default)]
    pub flexid: Option<String>,
    #[serde(default)]
    pub flexidtype: Option<i64>,
}

impl Request {
    /// Check the request carries a command and at least one identity.
    pub fn validate(&self) -> Result<(), AbotError> {
        if self.cmd.trim().is_empty() {
            return Err(AbotError::BadRequest("missing cmd".into()));
        }
        let has_uid = self.uid.is_some_and(|id| id > 0);
        let has_flex = self.flexid.as_deref().is_some_and(|f| !f.trim().is_empty());
        if !has_uid && !has_flex {
            return Err(AbotError::BadRequest(
                "missing uid or flexid".into(),
            ));
        }
        if has_flex && !has_uid && self.flexidtype.is_none() {
            return Err(AbotError::BadRequest("missing flexidtype".into()));
        }
        Ok(())
    }

    /// The flex-id carried by the request, if any.
    pub fn flex_id(&self) -> Result<Option<FlexId>, AbotError> {
        match (self.flexid.as_deref(), self.flexidtype) {
            (Some(value), Some(code)) if !value.trim().is_empty() => {
                FlexId::from_parts(value.trim(), code).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// The set of commands, objects and intents a plugin claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub intents: Vec<String>,
}

impl Trigger {
    /// Every route this trigger claims.
    pub fn routes(&self) -> Vec<String> {
        let mut routes = Vec::new();
        for command in &self.commands {
            for object in &self.objects {
                routes.push(route_for(command, object));
            }
        }
        routes
    }
}

/// What a plugin sends when it registers with the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub maintainer: String,
    pub rpc_address: String,
    #[serde(default)]
    pub trigger: Trigger,
    /// Example sentences, used in help replies.
    #[serde(default)]
    pub usage: Vec<String>,
}

impl PluginDescriptor {
    pub fn validate(&self) -> Result<(), AbotError> {
        if self.name.trim().is_empty() {
            return Err(AbotError::BadRequest("missing plugin name".into()));
        }
        if self.rpc_address.trim().is_empty() {
            return Err(AbotError::BadRequest(format!(
                "plugin `{}` has no rpc address",
                self.name
            )));
        }
        if self.trigger.commands.is_empty() || self.trigger.objects.is_empty() {
            return Err(AbotError::BadRequest(format!(
                "plugin `{}` is missing a trigger",
                self.name
            )));
        }
        Ok(())
    }
}

/// A future-dated outbound message.
///
/// The flex-id parts are kept raw so that a row with an unknown kind can
/// still be loaded and reported instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: i64,
    pub content: String,
    pub flexid: String,
    pub flexidtype: i64,
    pub send_at: String,
    pub sent: bool,
    #[serde(default)]
    pub plugin: String,
}

impl ScheduledEvent {
    pub fn flex_id(&self) -> Result<FlexId, AbotError> {
        FlexId::from_parts(self.flexid.clone(), self.flexidtype)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Sms,
    Email,
    Storage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_is_lowercased_pair() {
        assert_eq!(route_for("Find", "PIZZA"), "find_pizza");
    }

    #[test]
    fn candidate_routes_are_commands_outer_objects_inner() {
        let si = StructuredInput {
            commands: vec!["find".into(), "show".into()],
            objects: vec!["food".into(), "pizza".into()],
            ..Default::default()
        };
        assert_eq!(
            si.candidate_routes(),
            vec!["find_food", "find_pizza", "show_food", "show_pizza"]
        );
    }

    #[test]
    fn flex_id_kind_codes() {
        assert_eq!(FlexIdKind::Email.code(), 1);
        assert_eq!(FlexIdKind::Phone.code(), 2);
        assert_eq!(FlexIdKind::WebSession.code(), 3);
        assert!(FlexIdKind::try_from(9).is_err());
    }

    #[test]
    fn flex_id_from_parts() {
        let flex = FlexId::from_parts("+13105550123", 2).unwrap();
        assert_eq!(flex, FlexId::Phone("+13105550123".into()));
        assert_eq!(flex.kind(), FlexIdKind::Phone);
        assert_eq!(flex.value(), "+13105550123");
    }

    #[test]
    fn unknown_flexidtype_mentions_the_code() {
        let err = FlexId::from_parts("x", 7).unwrap_err();
        assert!(err.to_string().contains("unrecognized flexidtype 7"));
    }

    #[test]
    fn request_requires_cmd() {
        let req = Request {
            cmd: "  ".into(),
            uid: Some(1),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(AbotError::BadRequest(_))));
    }

    #[test]
    fn request_requires_some_identity() {
        let req = Request {
            cmd: "hi".into(),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = Request {
            cmd: "hi".into(),
            flexid: Some("+1310".into()),
            flexidtype: Some(2),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn request_deserializes_from_api_json() {
        let req: Request =
            serde_json::from_str(r#"{"cmd":"find pizza","flexid":"a@b.co","flexidtype":1}"#)
                .unwrap();
        assert_eq!(req.cmd, "find pizza");
        assert_eq!(req.flex_id().unwrap(), Some(FlexId::Email("a@b.co".into())));
    }

    #[test]
    fn msg_owner_prefers_user() {
        let msg = Msg {
            user: Some(User {
                id: 4,
                name: "Ann".into(),
                email: "ann@example.com".into(),
                admin: false,
                trainer: false,
            }),
            flex_id: Some(FlexId::Phone("+1".into())),
            ..Default::default()
        };
        assert_eq!(msg.owner(), Some(Owner::User(4)));
    }

    #[test]
    fn descriptor_without_trigger_is_rejected() {
        let desc = PluginDescriptor {
            name: "yelp".into(),
            rpc_address: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        assert!(desc.validate().is_err());
    }

    #[test]
    fn trigger_routes_cover_the_product() {
        let trigger = Trigger {
            commands: vec!["find".into(), "show".into()],
            objects: vec!["food".into(), "pizza".into()],
            intents: vec![],
        };
        assert_eq!(trigger.routes().len(), 4);
    }
}
