// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin SDK for Abot.
//!
//! A plugin is a separate process. It declares which command/object pairs
//! it answers, builds its conversation out of [`State`]s and keyword
//! handlers, and serves the `Run`/`FollowUp` calls the core makes:
//!
//! - [`Plugin`] / [`PluginBuilder`] describe the plugin
//! - [`StateMachine`] walks a user through the states, resuming across calls
//! - [`Memory`] is the plugin's per-user key/value view
//! - [`server::serve`] binds, registers with the core and serves calls

pub mod ctx;
pub mod keywords;
pub mod memory;
pub mod plugin;
pub mod server;
pub mod state;

pub use abot_core::rpc::CORE_ADDR_ENV;
pub use ctx::Ctx;
pub use keywords::Keywords;
pub use memory::Memory;
pub use plugin::{Plugin, PluginBuilder};
pub use server::{core_addr_from_env, rpc_router, serve};
pub use state::{Flow, Reply, STATE_ENTERED_KEY, STATE_KEY, State, StateMachine};
