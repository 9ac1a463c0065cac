// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Natural-language front end of the Abot core.
//!
//! Turns a raw sentence into tokens, Porter2 stems and a
//! [`StructuredInput`](abot_core::StructuredInput) of commands, objects,
//! people and times. All tables are loaded once and read-only afterwards.

pub mod classify;
pub mod dictionary;
pub mod language;
pub mod pipeline;
pub mod spell;
pub mod stem;
pub mod timeparse;
pub mod tokenize;

pub use classify::Classifier;
pub use dictionary::WordLists;
pub use language::{Nicety, OFFENSE_REPLY, OffensiveSet, confused, help_reply, nicety};
pub use pipeline::{Analysis, Pipeline};
pub use spell::SpellModel;
pub use stem::Porter2;
pub use tokenize::tokenize;
