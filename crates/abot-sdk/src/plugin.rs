// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A plugin: its descriptor, keyword handlers and state machine.

use abot_core::rpc::{PluginRequest, PluginResponse};
use abot_core::{AbotError, PluginDescriptor};
use abot_nlp::Porter2;
use chrono::NaiveDateTime;
use tracing::debug;

use crate::ctx::Ctx;
use crate::keywords::Keywords;
use crate::memory::Memory;
use crate::state::{State, StateMachine};

/// A fully configured plugin, ready to be served.
#[derive(Debug)]
pub struct Plugin {
    descriptor: PluginDescriptor,
    keywords: Keywords,
    machine: StateMachine,
    stemmer: Porter2,
}

impl Plugin {
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Descriptor without an RPC address; the server fills it in.
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Answer one `Run` (`first_contact`) or `FollowUp` call.
    pub fn handle(&self, req: PluginRequest, first_contact: bool) -> PluginResponse {
        self.handle_at(req, first_contact, chrono::Local::now().naive_local())
    }

    /// [`Plugin::handle`] with an explicit clock.
    pub fn handle_at(
        &self,
        req: PluginRequest,
        first_contact: bool,
        now: NaiveDateTime,
    ) -> PluginResponse {
        let mut ctx = Ctx::at(req.msg, Memory::new(req.memory), now);
        if first_contact {
            debug!(plugin = %self.descriptor.name, "first contact, resetting");
            ctx.memory.clear();
            self.machine.reset(&mut ctx);
        }

        let reply = match self.keywords.handle(&mut ctx, &self.stemmer) {
            Some(reply) => reply,
            None => self.machine.next(&mut ctx),
        };
        ctx.into_response(reply)
    }
}

/// Builder for [`Plugin`].
pub struct PluginBuilder {
    descriptor: PluginDescriptor,
    keywords: Keywords,
    machine: StateMachine,
    stemmer: Porter2,
}

impl PluginBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            descriptor: PluginDescriptor {
                name: name.into(),
                ..Default::default()
            },
            keywords: Keywords::new(),
            machine: StateMachine::new(),
            stemmer: Porter2::default(),
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.descriptor.icon = icon.into();
        self
    }

    pub fn maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.descriptor.maintainer = maintainer.into();
        self
    }

    /// Commands this plugin claims in its trigger.
    pub fn commands(mut self, commands: &[&str]) -> Self {
        push_unique(&mut self.descriptor.trigger.commands, commands);
        self
    }

    /// Objects this plugin claims in its trigger.
    pub fn objects(mut self, objects: &[&str]) -> Self {
        push_unique(&mut self.descriptor.trigger.objects, objects);
        self
    }

    /// Intents declared in the trigger. They are registered with the core but
    /// play no part in routing, which matches commands against objects.
    pub fn intents(mut self, intents: &[&str]) -> Self {
        push_unique(&mut self.descriptor.trigger.intents, intents);
        self
    }

    /// Example sentences shown in help replies.
    pub fn usage(mut self, examples: &[&str]) -> Self {
        self.descriptor
            .usage
            .extend(examples.iter().map(|s| s.to_string()));
        self
    }

    /// A keyword handler. Its words are also claimed in the trigger.
    pub fn keyword<F>(mut self, commands: &[&str], objects: &[&str], handler: F) -> Self
    where
        F: Fn(&mut Ctx) -> String + Send + Sync + 'static,
    {
        self.keywords.add(&self.stemmer, commands, objects, handler);
        self.commands(commands).objects(objects)
    }

    /// Append a group of states to the machine.
    pub fn states(mut self, group: Vec<State>) -> Self {
        self.machine.push_states(group);
        self
    }

    pub fn on_reset<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Ctx) + Send + Sync + 'static,
    {
        self.machine.set_on_reset(f);
        self
    }

    pub fn build(self) -> Result<Plugin, AbotError> {
        let d = &self.descriptor;
        if d.name.trim().is_empty() {
            return Err(AbotError::BadRequest("missing plugin name".into()));
        }
        if d.trigger.commands.is_empty() || d.trigger.objects.is_empty() {
            return Err(AbotError::BadRequest(format!(
                "plugin `{}` is missing a trigger",
                d.name
            )));
        }
        Ok(Plugin {
            descriptor: self.descriptor,
            keywords: self.keywords,
            machine: self.machine,
            stemmer: self.stemmer,
        })
    }
}

fn push_unique(list: &mut Vec<String>, words: &[&str]) {
    for word in words {
        let word = word.to_lowercase();
        if !list.contains(&word) {
            list.push(word);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use abot_core::{Msg, StructuredInput};

    use super::*;
    use crate::state::STATE_KEY;

    fn request(sentence: &str, commands: &[&str], objects: &[&str]) -> PluginRequest {
        PluginRequest {
            msg: Msg {
                sentence: sentence.into(),
                structured_input: StructuredInput {
                    commands: commands.iter().map(|s| s.to_string()).collect(),
                    objects: objects.iter().map(|s| s.to_string()).collect(),
                    ..Default::default()
                },
                ..Default::default()
            },
            memory: BTreeMap::new(),
        }
    }

    fn pizza() -> Plugin {
        Plugin::builder("yelp")
            .commands(&["find", "show"])
            .objects(&["food", "pizza"])
            .usage(&["find pizza nearby"])
            .keyword(&["show"], &["more"], |c| {
                let offset = c.memory.get_int64("offset").unwrap_or(0) + 1;
                c.memory.set_int64("offset", offset);
                format!("Page {offset}.")
            })
            .states(vec![
                State::new()
                    .on_entry(|_: &mut Ctx| "Where are you?")
                    .on_input(|c: &mut Ctx| {
                        let s = c.msg.sentence.clone();
                        c.memory.set_string("location", &s);
                    })
                    .complete(|c: &Ctx| (c.memory.has("location"), "Where?".into())),
                State::new()
                    .on_entry(|c: &mut Ctx| {
                        format!("Pizza near {}.", c.memory.get_string("location").unwrap_or_default())
                    })
                    .complete(|_: &Ctx| (false, "Anything else?".into())),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn builder_claims_keyword_words() {
        let p = pizza();
        let trigger = &p.descriptor().trigger;
        assert_eq!(trigger.commands, vec!["find", "show"]);
        assert_eq!(trigger.objects, vec!["food", "pizza", "more"]);
        assert_eq!(p.machine().len(), 2);
    }

    #[test]
    fn declared_intents_are_registered_without_handlers() {
        let p = Plugin::builder("orders")
            .commands(&["cancel"])
            .objects(&["order"])
            .intents(&["Cancel", "cancel", "refund"])
            .build()
            .unwrap();
        assert_eq!(p.descriptor().trigger.intents, vec!["cancel", "refund"]);
    }

    #[test]
    fn builder_requires_a_trigger() {
        assert!(Plugin::builder("empty").build().is_err());
        assert!(Plugin::builder("").commands(&["a"]).objects(&["b"]).build().is_err());
    }

    #[test]
    fn run_clears_memory_and_enters_first_state() {
        let p = pizza();
        let mut req = request("find pizza", &["find"], &["pizza"]);
        req.memory.insert("location".into(), b"\"Boston\"".to_vec());
        req.memory.insert(STATE_KEY.into(), b"1".to_vec());

        let resp = p.handle(req, true);
        assert_eq!(resp.reply, "Where are you?");
        assert!(resp.memory.cleared);
        assert_eq!(resp.memory.set.get(STATE_KEY).map(Vec::as_slice), Some(&b"0"[..]));
        assert!(!resp.memory.set.contains_key("location"));
    }

    #[test]
    fn follow_up_advances_with_snapshot() {
        let p = pizza();
        let first = p.handle(request("find pizza", &["find"], &["pizza"]), true);

        let mut req = request("Boston", &[], &[]);
        req.memory = first.memory.set;
        let resp = p.handle(req, false);
        assert_eq!(resp.reply, "Pizza near Boston.");
        assert!(!resp.memory.cleared);
    }

    #[test]
    fn keywords_run_before_the_machine() {
        let p = pizza();
        let mut req = request("show more", &["show"], &["more"]);
        req.memory.insert("offset".into(), b"2".to_vec());
        let resp = p.handle(req, false);
        assert_eq!(resp.reply, "Page 3.");
        assert!(!resp.memory.set.contains_key(STATE_KEY));
    }
}
