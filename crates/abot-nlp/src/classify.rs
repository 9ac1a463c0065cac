// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dictionary classifier.
//!
//! A single set of prefix-encoded keys (`C` command, `O` object, `PM`/`PF`
//! male/female name) gives constant-time lookup of every bucket a word
//! belongs to. A word may land in several buckets; routing filters the
//! noise.

use std::collections::HashSet;

use abot_core::{Person, Sex, StructuredInput};
use chrono::NaiveDateTime;

use crate::stem::Porter2;
use crate::timeparse;

const COMMAND: &str = "C";
const OBJECT: &str = "O";
const MALE: &str = "PM";
const FEMALE: &str = "PF";

/// Tokens that never extend a time section.
fn is_section_noise(token: &str) -> bool {
    matches!(
        token,
        "." | "," | ";" | "?" | "-" | "_" | "=" | "+" | "#" | "@" | "!" | "$" | "%" | "^" | "&"
            | "*" | "(" | ")" | "'"
    )
}

/// Immutable word → bucket lookup table.
#[derive(Debug, Default)]
pub struct Classifier {
    keys: HashSet<String>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, word: &str) {
        self.insert(COMMAND, word);
    }

    pub fn add_object(&mut self, word: &str) {
        self.insert(OBJECT, word);
    }

    pub fn add_name(&mut self, name: &str, sex: Sex) {
        match sex {
            Sex::Male => self.insert(MALE, name),
            Sex::Female => self.insert(FEMALE, name),
            Sex::Either => {
                self.insert(MALE, name);
                self.insert(FEMALE, name);
            }
            Sex::Invalid => {}
        }
    }

    fn insert(&mut self, prefix: &str, word: &str) {
        let word = word.trim().to_lowercase();
        if !word.is_empty() {
            self.keys.insert(format!("{prefix}{word}"));
        }
    }

    fn has(&self, prefix: &str, word: &str) -> bool {
        self.keys.contains(&format!("{prefix}{word}"))
    }

    /// Number of keys across all buckets.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True if the lowercased word, or failing that its stem, is in `prefix`.
    fn lookup(&self, prefix: &str, lower: &str, stem: &str) -> bool {
        self.has(prefix, lower) || (stem != lower && self.has(prefix, stem))
    }

    fn sex_of(&self, lower: &str) -> Sex {
        match (self.has(MALE, lower), self.has(FEMALE, lower)) {
            (true, true) => Sex::Either,
            (true, false) => Sex::Male,
            (false, true) => Sex::Female,
            (false, false) => Sex::Invalid,
        }
    }

    /// Classify tokens into a [`StructuredInput`].
    ///
    /// Times are only searched inside contiguous stretches of unclassified
    /// tokens, so a time never spans a command, object or name.
    pub fn classify(
        &self,
        tokens: &[String],
        stemmer: &Porter2,
        now: NaiveDateTime,
    ) -> StructuredInput {
        let mut si = StructuredInput::default();
        let mut sections: Vec<String> = Vec::new();

        for token in tokens {
            let lower = token.to_lowercase();
            let stem = stemmer.stem(&lower);
            let mut found = false;

            if self.lookup(COMMAND, &lower, &stem) {
                si.commands.push(lower.clone());
                found = true;
            }
            if self.lookup(OBJECT, &lower, &stem) {
                si.objects.push(lower.clone());
                found = true;
            }
            let sex = self.sex_of(&lower);
            if sex != Sex::Invalid {
                si.people.push(Person {
                    name: token.clone(),
                    sex,
                });
                found = true;
            }

            if found || sections.is_empty() {
                sections.push(token.clone());
            } else if !is_section_noise(token) {
                if let Some(last) = sections.last_mut() {
                    last.push(' ');
                    last.push_str(token);
                }
            }
        }

        for section in sections.iter().filter(|s| !s.is_empty()) {
            si.times.extend(timeparse::parse(section, now));
        }
        si
    }
}
