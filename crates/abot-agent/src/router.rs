// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Choosing the plugin for a message.
//!
//! 1. Identities not bound to a user go to `onboard_onboard`, as a follow-up.
//! 2. The first candidate route (commands outer, objects inner) that is
//!    registered wins, as a first contact.
//! 3. Otherwise the route of the owner's previous inbound message, if still
//!    registered, as a follow-up.
//! 4. Otherwise no plugin.

use std::sync::Arc;

use abot_core::{AbotError, Msg, ONBOARD_ROUTE, Owner};
use abot_plugin::{RegisteredPlugin, Registry};
use abot_storage::Database;
use abot_storage::queries::messages;
use tracing::{debug, warn};

/// Where a message goes.
#[derive(Debug, Clone)]
pub struct Route {
    pub plugin: Arc<RegisteredPlugin>,
    pub route: String,
    pub follow_up: bool,
}

impl Route {
    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }
}

/// Route `msg`. `Ok(None)` means no plugin claims it.
pub async fn route(
    registry: &Registry,
    db: &Database,
    msg: &Msg,
    owner: &Owner,
) -> Result<Option<Route>, AbotError> {
    if msg.user.is_none() {
        let Some(plugin) = registry.get(ONBOARD_ROUTE).await else {
            warn!("onboarding plugin is not registered");
            return Ok(None);
        };
        debug!(owner = %owner, "unregistered identity, onboarding");
        return Ok(Some(Route {
            plugin,
            route: ONBOARD_ROUTE.to_string(),
            follow_up: true,
        }));
    }

    let candidates = msg.structured_input.candidate_routes();
    if let Some((route, plugin)) = registry.first_match(&candidates).await {
        debug!(route = %route, plugin = %plugin.name(), "matched route");
        return Ok(Some(Route {
            plugin,
            route,
            follow_up: false,
        }));
    }

    let Some(previous) = messages::last_inbound_route(db, owner).await? else {
        debug!("no route and no previous message");
        return Ok(None);
    };
    if previous.is_empty() {
        return Ok(None);
    }
    match registry.get(&previous.route).await {
        Some(plugin) => {
            debug!(route = %previous.route, plugin = %plugin.name(), "continuing previous route");
            Ok(Some(Route {
                plugin,
                route: previous.route,
                follow_up: true,
            }))
        }
        None => {
            debug!(route = %previous.route, "previous route no longer registered");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abot_core::{FlexId, PluginDescriptor, StructuredInput, Trigger, User};
    use proptest::prelude::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let registry = Registry::default();
        registry
            .register(descriptor("yelp", &["find", "show"], &["food", "pizza"]))
            .await
            .unwrap();
        registry
            .register(descriptor("onboard", &["onboard"], &["onboard"]))
            .await
            .unwrap();
        (dir, db, registry)
    }

    fn descriptor(name: &str, commands: &[&str], objects: &[&str]) -> PluginDescriptor {
        PluginDescriptor {
            name: name.into(),
            rpc_address: "http://127.0.0.1:9".into(),
            trigger: Trigger {
                commands: commands.iter().map(|s| s.to_string()).collect(),
                objects: objects.iter().map(|s| s.to_string()).collect(),
                intents: vec![],
            },
            ..Default::default()
        }
    }

    fn user_msg(commands: &[&str], objects: &[&str]) -> Msg {
        Msg {
            user: Some(User {
                id: 1,
                name: "Ann".into(),
                email: "ann@example.com".into(),
                admin: false,
                trainer: false,
            }),
            structured_input: StructuredInput {
                commands: commands.iter().map(|s| s.to_string()).collect(),
                objects: objects.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unregistered_identities_onboard() {
        let (_dir, db, registry) = setup().await;
        let msg = Msg {
            flex_id: Some(FlexId::Phone("+13105550123".into())),
            sentence: "find pizza".into(),
            ..Default::default()
        };
        let owner = msg.owner().unwrap();
        let r = route(&registry, &db, &msg, &owner).await.unwrap().unwrap();
        assert_eq!(r.route, ONBOARD_ROUTE);
        assert_eq!(r.plugin_name(), "onboard");
        assert!(r.follow_up);
    }

    #[tokio::test]
    async fn trigger_match_is_first_contact() {
        let (_dir, db, registry) = setup().await;
        let msg = user_msg(&["find"], &["pizza", "nearby"]);
        let r = route(&registry, &db, &msg, &Owner::User(1)).await.unwrap().unwrap();
        assert_eq!(r.route, "find_pizza");
        assert_eq!(r.plugin_name(), "yelp");
        assert!(!r.follow_up);
    }

    #[tokio::test]
    async fn falls_back_to_previous_route() {
        let (_dir, db, registry) = setup().await;
        let mut first = user_msg(&["find"], &["pizza"]);
        first.plugin = "yelp".into();
        first.route = "find_pizza".into();
        messages::insert_message(&db, &first).await.unwrap();

        let msg = user_msg(&[], &[]);
        let r = route(&registry, &db, &msg, &Owner::User(1)).await.unwrap().unwrap();
        assert_eq!(r.route, "find_pizza");
        assert!(r.follow_up);
    }

    #[tokio::test]
    async fn nothing_to_continue() {
        let (_dir, db, registry) = setup().await;
        let msg = user_msg(&["dance"], &[]);
        assert!(route(&registry, &db, &msg, &Owner::User(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn previous_route_must_still_be_registered() {
        let (_dir, db, registry) = setup().await;
        let mut first = user_msg(&["book"], &["flight"]);
        first.plugin = "travel".into();
        first.route = "book_flight".into();
        messages::insert_message(&db, &first).await.unwrap();

        let msg = user_msg(&[], &[]);
        assert!(route(&registry, &db, &msg, &Owner::User(1)).await.unwrap().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any message carrying one of a plugin's commands and one of its
        /// objects routes to it as a first contact.
        #[test]
        fn claimed_pairs_always_route(
            c in 0usize..2,
            o in 0usize..2,
            noise in proptest::collection::vec("[a-z]{3,8}", 0..3),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (_dir, db, registry) = setup().await;
                let command = ["find", "show"][c];
                let object = ["food", "pizza"][o];
                let mut objects: Vec<&str> = noise.iter().map(String::as_str).collect();
                objects.push(object);
                let msg = user_msg(&[command], &objects);
                let r = route(&registry, &db, &msg, &Owner::User(1)).await.unwrap().unwrap();
                assert_eq!(r.plugin_name(), "yelp");
                assert!(!r.follow_up);
            });
        }
    }
}
