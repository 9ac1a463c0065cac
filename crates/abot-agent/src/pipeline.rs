// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request pipeline: identify, analyze, add context, route, call the
//! plugin, fall back to canned replies, persist.

use std::sync::Arc;

use abot_core::rpc::{PluginRequest, PluginResponse, ScheduleRequest};
use abot_core::{AbotError, FlexId, Msg, Owner, Request, SmsSender, User};
use abot_nlp::{Nicety, OFFENSE_REPLY, Pipeline, confused, help_reply, nicety};
use abot_plugin::{Registry, dispatch};
use abot_storage::Database;
use abot_storage::queries::{flexids, messages, scheduled, states, users};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::context;
use crate::router::{self, Route};

/// Result of one processed message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    /// What to send back. Empty when the message was acknowledged silently.
    pub reply: String,
    pub inbound_id: i64,
    /// Id of the persisted reply, if there was one.
    pub outbound_id: Option<i64>,
    pub plugin: String,
    pub route: String,
    pub follow_up: bool,
    pub user_id: Option<i64>,
    /// The structured input the plugin was given.
    pub structured: abot_core::StructuredInput,
}

/// Everything a request needs, built once at boot and shared by handlers.
#[derive(Clone)]
pub struct Core {
    db: Database,
    nlp: Arc<Pipeline>,
    registry: Arc<Registry>,
    sms: Option<Arc<dyn SmsSender>>,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("sms", &self.sms.as_ref().map(|s| s.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl Core {
    pub fn new(
        db: Database,
        nlp: Arc<Pipeline>,
        registry: Arc<Registry>,
        sms: Option<Arc<dyn SmsSender>>,
    ) -> Self {
        Self {
            db,
            nlp,
            registry,
            sms,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn sms(&self) -> Option<&Arc<dyn SmsSender>> {
        self.sms.as_ref()
    }

    /// Process one inbound request and return the reply.
    pub async fn process_text(&self, req: &Request) -> Result<Turn, AbotError> {
        self.process_text_at(req, chrono::Local::now().naive_local())
            .await
    }

    /// [`Core::process_text`] with an explicit clock.
    pub async fn process_text_at(
        &self,
        req: &Request,
        now: NaiveDateTime,
    ) -> Result<Turn, AbotError> {
        req.validate()?;
        let (user, flex_id) = self.identify(req).await?;

        let analysis = self.nlp.analyze(&req.cmd, now).await;
        let mut msg = Msg {
            user,
            flex_id,
            sentence: req.cmd.clone(),
            tokens: analysis.tokens,
            stems: analysis.stems,
            structured_input: analysis.structured,
            ..Default::default()
        };
        let owner = msg
            .owner()
            .ok_or_else(|| AbotError::BadRequest("missing uid or flexid".into()))?;

        // Only what this message said becomes new context; values filled in
        // from context would otherwise narrow it.
        let said = msg.structured_input.clone();
        context::add_context(&self.db, &owner, &mut msg.structured_input, &msg.stems).await?;
        context::save_context(&self.db, &owner, &said).await?;

        let route = router::route(&self.registry, &self.db, &msg, &owner).await?;
        if let Some(r) = &route {
            msg.plugin = r.plugin_name().to_string();
            msg.route = r.route.clone();
        }
        msg.id = messages::insert_message(&self.db, &msg).await?;
        debug!(
            id = msg.id,
            owner = %owner,
            plugin = %msg.plugin,
            route = %msg.route,
            "inbound message"
        );

        let mut turn = Turn {
            inbound_id: msg.id,
            plugin: msg.plugin.clone(),
            route: msg.route.clone(),
            follow_up: route.as_ref().is_some_and(|r| r.follow_up),
            user_id: msg.user.as_ref().map(|u| u.id),
            structured: msg.structured_input.clone(),
            ..Default::default()
        };

        if analysis.offensive {
            info!(id = msg.id, "offensive message, refusing");
            turn.reply = OFFENSE_REPLY.to_string();
            turn.outbound_id = Some(self.persist_reply(&msg, &turn.reply).await?);
            return Ok(turn);
        }

        let mut reply = match &route {
            Some(r) => self.call_plugin(r, &msg, &owner, now).await?,
            None => String::new(),
        };

        if reply.is_empty()
            && let Some(help) = help_reply(
                &msg.structured_input.commands,
                &self.registry.usages().await,
            )
        {
            reply = help;
        }
        if reply.is_empty() {
            match nicety(&msg.stems) {
                Some(Nicety::Reply(text)) => reply = text.to_string(),
                Some(Nicety::Silent) => {
                    debug!(id = msg.id, "acknowledged without reply");
                    return Ok(turn);
                }
                None => {}
            }
        }
        if reply.is_empty() {
            messages::set_needs_training(&self.db, msg.id, true).await?;
            reply = confused().to_string();
        }

        turn.outbound_id = Some(self.persist_reply(&msg, &reply).await?);
        turn.reply = reply;
        Ok(turn)
    }

    /// Resolve who sent the request. Unknown user ids are rejected; unknown
    /// flex-ids are recorded and stay unbound.
    async fn identify(&self, req: &Request) -> Result<(Option<User>, Option<FlexId>), AbotError> {
        let flex_id = req.flex_id()?;
        if let Some(uid) = req.uid.filter(|id| *id > 0) {
            let user = users::get_user(&self.db, uid)
                .await?
                .ok_or_else(|| AbotError::BadRequest(format!("unknown user {uid}")))?;
            return Ok((Some(user), flex_id));
        }
        let Some(flex) = flex_id else {
            return Err(AbotError::BadRequest("missing uid or flexid".into()));
        };
        flexids::ensure_flexid(&self.db, &flex).await?;
        let user = users::get_user_by_flexid(&self.db, &flex).await?;
        Ok((user, Some(flex)))
    }

    /// Call the routed plugin with its memory, then apply what it returned.
    async fn call_plugin(
        &self,
        route: &Route,
        msg: &Msg,
        owner: &Owner,
        now: NaiveDateTime,
    ) -> Result<String, AbotError> {
        let name = route.plugin_name();
        let mut memory = states::plugin_memory(&self.db, owner, name).await?;
        memory.extend(context::snapshot(&self.db, owner).await?);
        let req = PluginRequest {
            msg: msg.clone(),
            memory,
        };
        let PluginResponse {
            reply,
            mut memory,
            scheduled,
        } = dispatch::call(&route.plugin, &req, !route.follow_up).await;

        let dropped = context::strip_context_keys(&mut memory);
        if dropped > 0 {
            warn!(plugin = name, dropped, "plugin tried to change conversation context");
        }
        states::apply_delta(&self.db, owner, name, &memory).await?;
        for event in scheduled {
            self.schedule(msg, name, event, now).await?;
        }
        Ok(reply)
    }

    async fn schedule(
        &self,
        msg: &Msg,
        plugin: &str,
        event: ScheduleRequest,
        now: NaiveDateTime,
    ) -> Result<(), AbotError> {
        if event.send_at < now {
            warn!(plugin, send_at = %event.send_at, "plugin scheduled a message in the past");
            return Ok(());
        }
        // A web session cannot receive texts; signed-up users get them on
        // their phone.
        let to = match (&msg.flex_id, &msg.user) {
            (Some(flex @ FlexId::Phone(_)), _) => Some(flex.clone()),
            (_, Some(user)) => flexids::phone_for_user(&self.db, user.id).await?,
            (flex, None) => flex.clone(),
        };
        let Some(to) = to else {
            warn!(plugin, "no address to deliver scheduled message to");
            return Ok(());
        };
        let id = scheduled::schedule_event(&self.db, &event.content, &to, event.send_at, plugin)
            .await?;
        debug!(id, plugin, send_at = %event.send_at, "scheduled message");
        Ok(())
    }

    /// Persist the reply. Failing here means the reply must not be sent.
    async fn persist_reply(&self, inbound: &Msg, reply: &str) -> Result<i64, AbotError> {
        let outbound = Msg {
            user: inbound.user.clone(),
            flex_id: inbound.flex_id.clone(),
            sentence: reply.to_string(),
            plugin: inbound.plugin.clone(),
            route: inbound.route.clone(),
            abot_sent: true,
            ..Default::default()
        };
        messages::insert_message(&self.db, &outbound).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abot_core::Sex;
    use abot_nlp::WordLists;
    use abot_nlp::language::confused_replies;
    use abot_storage::NewUser;
    use tempfile::TempDir;

    fn lists() -> WordLists {
        WordLists {
            nouns: vec!["pizza".into(), "food".into()],
            verbs: vec!["find".into(), "help".into()],
            names_male: vec!["jim".into()],
            names_female: vec!["sarah".into()],
            offensive: vec!["darn".into()],
            ..Default::default()
        }
    }

    async fn core() -> (TempDir, Core) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let nlp = Arc::new(Pipeline::from_word_lists(&lists(), 2, 4));
        let core = Core::new(db, nlp, Arc::new(Registry::default()), None);
        (dir, core)
    }

    async fn signup(core: &Core) -> i64 {
        users::create_user(
            core.db(),
            &NewUser {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                password_hash: "x".into(),
                phone: Some("+13105550123".into()),
                admin: false,
                trainer: false,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn from_user(uid: i64, cmd: &str) -> Request {
        Request {
            cmd: cmd.into(),
            uid: Some(uid),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let (_dir, core) = core().await;
        let err = core.process_text(&from_user(42, "hi")).await.unwrap_err();
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let (_dir, core) = core().await;
        let req = Request {
            cmd: "hi".into(),
            ..Default::default()
        };
        assert!(matches!(
            core.process_text(&req).await,
            Err(AbotError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn offensive_messages_are_refused_and_recorded() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        let turn = core.process_text(&from_user(uid, "darn it")).await.unwrap();
        assert_eq!(turn.reply, OFFENSE_REPLY);
        let out = messages::get_message(core.db(), turn.outbound_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(out.abot_sent);
        assert_eq!(out.sentence, OFFENSE_REPLY);
    }

    #[tokio::test]
    async fn niceties_answer_unrouted_messages() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        let turn = core.process_text(&from_user(uid, "thanks")).await.unwrap();
        assert_eq!(turn.reply, "You're welcome!");
        assert!(turn.plugin.is_empty());
    }

    #[tokio::test]
    async fn silent_nicety_persists_nothing_outbound() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        let turn = core.process_text(&from_user(uid, "ok")).await.unwrap();
        assert!(turn.reply.is_empty());
        assert!(turn.outbound_id.is_none());
        let inbound = messages::get_message(core.db(), turn.inbound_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!inbound.needs_training);
    }

    #[tokio::test]
    async fn confusion_flags_message_for_training() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        let turn = core
            .process_text(&from_user(uid, "find pizza"))
            .await
            .unwrap();
        assert!(confused_replies().contains(&turn.reply.as_str()));
        let inbound = messages::get_message(core.db(), turn.inbound_id)
            .await
            .unwrap()
            .unwrap();
        assert!(inbound.needs_training);
        assert!(!inbound.abot_sent);
    }

    #[tokio::test]
    async fn unknown_flex_ids_are_recorded_unbound() {
        let (_dir, core) = core().await;
        let req = Request {
            cmd: "find pizza".into(),
            flexid: Some("+14155550100".into()),
            flexidtype: Some(2),
            ..Default::default()
        };
        let turn = core.process_text(&req).await.unwrap();
        assert!(turn.user_id.is_none());
        // No onboarding plugin is registered, so nothing claims it.
        assert!(confused_replies().contains(&turn.reply.as_str()));
        let flex = FlexId::Phone("+14155550100".into());
        assert!(users::get_user_by_flexid(core.db(), &flex).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn phone_identity_resolves_to_its_user() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        let req = Request {
            cmd: "thanks".into(),
            flexid: Some("+13105550123".into()),
            flexidtype: Some(2),
            ..Default::default()
        };
        let turn = core.process_text(&req).await.unwrap();
        assert_eq!(turn.user_id, Some(uid));
    }

    #[tokio::test]
    async fn pronouns_resolve_against_everyone_remembered() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        let sexes = |turn: &Turn| -> Vec<Sex> {
            turn.structured.people.iter().map(|p| p.sex).collect()
        };

        let first = core
            .process_text(&from_user(uid, "call jim and sarah"))
            .await
            .unwrap();
        assert_eq!(sexes(&first), vec![Sex::Male, Sex::Female]);

        let him = core
            .process_text(&from_user(uid, "then him"))
            .await
            .unwrap();
        assert_eq!(sexes(&him), vec![Sex::Male]);

        // "him" must not have narrowed what is remembered.
        let her = core
            .process_text(&from_user(uid, "then her"))
            .await
            .unwrap();
        assert_eq!(sexes(&her), vec![Sex::Female]);
        assert_eq!(her.structured.people[0].name, first.structured.people[1].name);
    }

    #[tokio::test]
    async fn reply_is_withheld_when_it_cannot_be_stored() {
        let (_dir, core) = core().await;
        let uid = signup(&core).await;
        core.db()
            .connection()
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_replies BEFORE INSERT ON messages
                     WHEN NEW.abotsent = 1
                     BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
                )
            })
            .await
            .map_err(abot_storage::database::map_tr_err)
            .unwrap();

        let err = core
            .process_text(&from_user(uid, "thanks"))
            .await
            .unwrap_err();
        assert!(matches!(err, AbotError::Storage { .. }), "{err}");
        assert!(!err.is_user_error());

        let stored = messages::conversation_page(core.db(), &Owner::User(uid), 0)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].abot_sent);
        assert_eq!(stored[0].sentence, "thanks");
    }
}
