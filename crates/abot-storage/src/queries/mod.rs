// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes `&Database`.

pub mod flexids;
pub mod messages;
pub mod scheduled;
pub mod states;
pub mod users;
