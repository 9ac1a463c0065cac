// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin plumbing for the Abot core.
//!
//! Plugins run as separate processes. They register with the core over the
//! RPC [`listener`], are stored in the route [`Registry`], and are called
//! through [`dispatch::call`].

pub mod client;
pub mod dispatch;
pub mod listener;
pub mod registry;
pub mod supervisor;

pub use client::PluginClient;
pub use registry::{RegisteredPlugin, Registry};
pub use supervisor::Supervisor;
