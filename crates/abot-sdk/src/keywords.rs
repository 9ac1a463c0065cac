// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless keyword handlers.
//!
//! Keyword handlers answer one-shot requests ("show me more", "what's my
//! order") without touching the state machine. They are tried before the
//! machine on every call.

use std::collections::HashMap;
use std::sync::Arc;

use abot_nlp::Porter2;
use tracing::debug;

use crate::ctx::Ctx;

pub type KeywordFn = Arc<dyn Fn(&mut Ctx) -> String + Send + Sync>;

fn command_object_key(command: &str, object: &str) -> String {
    format!("CO_{command}_{object}")
}

/// Handlers keyed by stemmed command/object pair.
#[derive(Clone, Default)]
pub struct Keywords {
    dict: HashMap<String, KeywordFn>,
}

impl std::fmt::Debug for Keywords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.dict.keys().collect();
        keys.sort();
        f.debug_struct("Keywords").field("keys", &keys).finish()
    }
}

impl Keywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every command × object pair. Words are
    /// stemmed so "showing" and "show" share a handler.
    pub fn add<F>(&mut self, stemmer: &Porter2, commands: &[&str], objects: &[&str], handler: F)
    where
        F: Fn(&mut Ctx) -> String + Send + Sync + 'static,
    {
        let handler: KeywordFn = Arc::new(handler);
        for command in commands {
            let command = stemmer.stem(command);
            for object in objects {
                let key = command_object_key(&command, &stemmer.stem(object));
                self.dict.insert(key, handler.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Run the first handler matching the message and return its reply.
    ///
    /// Pairs are tried commands (outer) × objects (inner). A handler
    /// returning an empty string counts as no match.
    pub fn handle(&self, ctx: &mut Ctx, stemmer: &Porter2) -> Option<String> {
        let si = ctx.msg.structured_input.clone();
        let pairs = si.commands.iter().flat_map(|c| {
            let c = stemmer.stem(c);
            si.objects
                .iter()
                .map(move |o| (c.clone(), o.clone()))
        });
        let pairs = pairs.map(|(c, o)| command_object_key(&c, &stemmer.stem(&o)));

        for key in pairs {
            let Some(handler) = self.dict.get(&key) else {
                continue;
            };
            debug!(key = %key, "keyword matched");
            let reply = handler(ctx);
            if !reply.is_empty() {
                return Some(reply);
            }
        }
        None
    }
}
