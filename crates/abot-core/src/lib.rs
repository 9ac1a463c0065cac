// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Abot assistant.
//!
//! Shared error type, domain types, the plugin wire protocol and the driver
//! traits used throughout the workspace.

pub mod error;
pub mod rpc;
pub mod traits;
pub mod types;

pub use error::AbotError;
pub use traits::{PluginAdapter, SmsSender};
pub use types::{
    AdapterType, FlexId, FlexIdKind, HealthStatus, Msg, ONBOARD_PLUGIN, ONBOARD_ROUTE, Owner,
    Person, PluginDescriptor, Request, ScheduledEvent, Sex, StructuredInput, Trigger, User,
    route_for,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abot_error_has_all_variants() {
        let _config = AbotError::Config("test".into());
        let _storage = AbotError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = AbotError::Channel {
            message: "test".into(),
            source: None,
        };
        let _rpc = AbotError::Rpc {
            message: "test".into(),
            source: None,
        };
        let _missing = AbotError::MissingPlugin {
            route: "find_pizza".into(),
        };
        let _bad = AbotError::BadRequest("test".into());
        let _unauth = AbotError::Unauthorized;
        let _timeout = AbotError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = AbotError::Internal("test".into());
    }

    #[test]
    fn user_errors_are_flagged() {
        assert!(AbotError::BadRequest("x".into()).is_user_error());
        assert!(AbotError::Unauthorized.is_user_error());
        assert!(!AbotError::Internal("x".into()).is_user_error());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;
        for ty in [AdapterType::Sms, AdapterType::Email, AdapterType::Storage] {
            let s = ty.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), ty);
        }
    }

    #[test]
    fn missing_plugin_message_names_route() {
        let err = AbotError::MissingPlugin {
            route: "find_pizza".into(),
        };
        assert!(err.to_string().contains("find_pizza"));
    }
}
