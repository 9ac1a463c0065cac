// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline of the Abot core.
//!
//! [`Core::process_text`] takes a transport-neutral [`Request`](abot_core::Request)
//! through identity resolution, language analysis, conversation context,
//! routing and the plugin call, and persists both sides of the exchange.
//! [`Scheduler`] delivers the messages plugins asked to send later.

pub mod context;
pub mod pipeline;
pub mod router;
pub mod scheduler;
pub mod shutdown;

pub use pipeline::{Core, Turn};
pub use router::Route;
pub use scheduler::{Delivery, Scheduler, TickReport};
pub use shutdown::install_signal_handler;
