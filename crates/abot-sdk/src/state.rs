// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resumable conversation state machines.
//!
//! A machine is an ordered list of [`State`]s. The current index and
//! whether its `on_entry` has already run are kept in the owner's memory
//! under [`STATE_KEY`] and [`STATE_ENTERED_KEY`], so the machine itself is
//! shared by every user.
//!
//! Handlers never move the machine directly. A jump by label is requested
//! through the returned [`Reply`] or [`Flow`] and performed by the driver
//! once the handler has returned.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ctx::Ctx;

/// Memory key holding the current state index.
pub const STATE_KEY: &str = "__state";

/// Memory key recording whether the current state has been entered.
pub const STATE_ENTERED_KEY: &str = "__state_entered";

/// Text produced by `on_entry`, optionally followed by a jump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub jump: Option<String>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            jump: None,
        }
    }

    /// Jump to `label` after this reply.
    pub fn then_jump(mut self, label: impl Into<String>) -> Self {
        self.jump = Some(label.into());
        self
    }

    pub fn jump(label: impl Into<String>) -> Self {
        Self::default().then_jump(label)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::new(text)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::new(text)
    }
}

/// What `on_input` wants to happen next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Flow {
    /// Check `complete` as usual.
    #[default]
    Continue,
    /// Jump to the labelled state instead.
    Jump(String),
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

pub type EntryFn = Arc<dyn Fn(&mut Ctx) -> Reply + Send + Sync>;
pub type InputFn = Arc<dyn Fn(&mut Ctx) -> Flow + Send + Sync>;
pub type CompleteFn = Arc<dyn Fn(&Ctx) -> (bool, String) + Send + Sync>;
pub type ResetFn = Arc<dyn Fn(&mut Ctx) + Send + Sync>;

/// One step of a conversation.
#[derive(Clone)]
pub struct State {
    on_entry: EntryFn,
    on_input: InputFn,
    complete: CompleteFn,
    label: Option<String>,
    skip_if_complete: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            on_entry: Arc::new(|_| Reply::default()),
            on_input: Arc::new(|_| Flow::Continue),
            complete: Arc::new(|_| (true, String::new())),
            label: None,
            skip_if_complete: false,
        }
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("label", &self.label)
            .field("skip_if_complete", &self.skip_if_complete)
            .finish_non_exhaustive()
    }
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs once when the state is entered; its text is sent to the user.
    pub fn on_entry<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&mut Ctx) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.on_entry = Arc::new(move |ctx| f(ctx).into());
        self
    }

    /// Consumes each user message while the state is current.
    pub fn on_input<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&mut Ctx) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on_input = Arc::new(move |ctx| f(ctx).into());
        self
    }

    /// Whether the machine may advance, and what to say if not.
    pub fn complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Ctx) -> (bool, String) + Send + Sync + 'static,
    {
        self.complete = Arc::new(f);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Skip this state on entry when it is already complete.
    pub fn skip_if_complete(mut self) -> Self {
        self.skip_if_complete = true;
        self
    }
}

/// Ordered states plus an optional reset hook.
#[derive(Clone, Default)]
pub struct StateMachine {
    states: Vec<State>,
    labels: HashMap<String, usize>,
    on_reset: Option<ResetFn>,
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("states", &self.states)
            .field("on_reset", &self.on_reset.is_some())
            .finish()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group of states. Groups let reusable flows (ask for an
    /// address, ask for a card) be spliced in order.
    pub fn push_states(&mut self, group: Vec<State>) {
        for state in group {
            if let Some(label) = &state.label {
                if self.labels.insert(label.clone(), self.states.len()).is_some() {
                    warn!(label = %label, "duplicate state label, last one wins");
                }
            }
            self.states.push(state);
        }
    }

    pub fn set_on_reset<F>(&mut self, f: F)
    where
        F: Fn(&mut Ctx) + Send + Sync + 'static,
    {
        self.on_reset = Some(Arc::new(f));
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Current state index for the message owner.
    pub fn index(&self, ctx: &Ctx) -> usize {
        ctx.memory
            .get_int64(STATE_KEY)
            .and_then(|i| usize::try_from(i).ok())
            .unwrap_or(0)
    }

    fn entered(&self, ctx: &Ctx) -> bool {
        ctx.memory.get_bool(STATE_ENTERED_KEY).unwrap_or(false)
    }

    fn move_to(&self, ctx: &mut Ctx, index: usize, entered: bool) {
        ctx.memory
            .set_int64(STATE_KEY, i64::try_from(index).unwrap_or(0));
        ctx.memory.set_bool(STATE_ENTERED_KEY, entered);
    }

    /// Back to the first state, not yet entered. Runs the reset hook.
    pub fn reset(&self, ctx: &mut Ctx) {
        self.move_to(ctx, 0, false);
        if let Some(hook) = &self.on_reset {
            hook(ctx);
        }
    }

    /// Drive the machine with the message in `ctx` and return the reply.
    ///
    /// An entered state consumes the input and advances only when its
    /// `complete` holds, otherwise its replay text is returned. Running
    /// past the last state resets to the first.
    pub fn next(&self, ctx: &mut Ctx) -> String {
        if self.states.is_empty() {
            return String::new();
        }
        if self.index(ctx) >= self.states.len() {
            debug!("state index past the end, resetting");
            self.reset(ctx);
        }
        if !self.entered(ctx) {
            return self.enter(ctx);
        }

        let index = self.index(ctx);
        let state = &self.states[index];
        if let Flow::Jump(label) = (state.on_input)(ctx) {
            return self.set_state(ctx, &label);
        }
        let (done, replay) = (state.complete)(ctx);
        if !done {
            debug!(index, "state incomplete, replaying");
            return replay;
        }

        if index + 1 >= self.states.len() {
            debug!("finished states, resetting");
            self.reset(ctx);
        } else {
            self.move_to(ctx, index + 1, false);
        }
        self.enter(ctx)
    }

    /// Enter the current state, skipping states marked `skip_if_complete`
    /// that are already complete.
    fn enter(&self, ctx: &mut Ctx) -> String {
        let mut index = self.index(ctx);
        let mut skipped = 0;
        loop {
            let state = &self.states[index];
            let (done, _) = (state.complete)(ctx);
            if state.skip_if_complete && done {
                skipped += 1;
                if skipped >= self.states.len() {
                    warn!("every state is complete, nothing to enter");
                    self.reset(ctx);
                    return String::new();
                }
                debug!(index, "state already complete, skipping");
                index += 1;
                if index >= self.states.len() {
                    self.reset(ctx);
                    index = 0;
                } else {
                    self.move_to(ctx, index, false);
                }
                continue;
            }

            self.move_to(ctx, index, true);
            let reply = (state.on_entry)(ctx);
            // A finished final state would otherwise trap the user in it.
            if index + 1 >= self.states.len() && done {
                self.reset(ctx);
            }
            return self.follow(ctx, reply);
        }
    }

    fn follow(&self, ctx: &mut Ctx, reply: Reply) -> String {
        let Some(label) = reply.jump else {
            return reply.text;
        };
        let target = self.set_state(ctx, &label);
        match (reply.text.is_empty(), target.is_empty()) {
            (true, _) => target,
            (false, true) => reply.text,
            (false, false) => format!("{} {}", reply.text, target),
        }
    }

    /// Jump to a labelled state and enter it.
    ///
    /// Backward jumps are unchecked. Forward jumps stop at the first state
    /// in between whose `complete` is false.
    pub fn set_state(&self, ctx: &mut Ctx, label: &str) -> String {
        let Some(&target) = self.labels.get(label) else {
            warn!(label, "jump to unknown state label");
            return String::new();
        };
        let current = self.index(ctx).min(self.states.len() - 1);
        let mut dest = target;
        if current < target {
            for (i, state) in self.states.iter().enumerate().take(target).skip(current) {
                if !(state.complete)(ctx).0 {
                    dest = i;
                    break;
                }
            }
        }
        debug!(label, from = current, to = dest, "jumping");
        self.move_to(ctx, dest, true);
        let reply = (self.states[dest].on_entry)(ctx);
        if let Some(next) = reply.jump {
            warn!(from = label, to = %next, "ignoring chained jump");
        }
        reply.text
    }

    /// Re-run the current state's `on_entry` without moving.
    pub fn replay(&self, ctx: &mut Ctx) -> String {
        if self.states.is_empty() {
            return String::new();
        }
        let index = self.index(ctx).min(self.states.len() - 1);
        (self.states[index].on_entry)(ctx).text
    }
}
