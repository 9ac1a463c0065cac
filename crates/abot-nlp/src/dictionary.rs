// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Word lists loaded from the NLP data directory.
//!
//! Layout under `data_dir`:
//!
//! ```text
//! ner/nouns.txt ner/adjectives.txt ner/adverbs.txt   objects
//! ner/verbs.txt                                      commands
//! ner/names_male.txt ner/names_female.txt            people
//! offensive.txt                                      refused stems
//! spell/coca.txt                                     frequency corpus (weight 1)
//! spell/american-english.txt                         dictionary (weight 3)
//! ```
//!
//! The spelling corpora are optional; the classifier lists are not.

use std::path::{Path, PathBuf};

use abot_core::AbotError;
use tracing::{debug, warn};

/// Raw word lists, one entry per non-empty line.
#[derive(Debug, Clone, Default)]
pub struct WordLists {
    pub nouns: Vec<String>,
    pub verbs: Vec<String>,
    pub adjectives: Vec<String>,
    pub adverbs: Vec<String>,
    pub names_male: Vec<String>,
    pub names_female: Vec<String>,
    pub offensive: Vec<String>,
    /// Free text; every alphabetic run counts once.
    pub frequency_corpus: String,
    pub dictionary: Vec<String>,
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn read_required(path: &Path) -> Result<String, AbotError> {
    std::fs::read_to_string(path)
        .map_err(|e| AbotError::Config(format!("failed to read {}: {e}", path.display())))
}

fn read_optional(path: &Path) -> Result<String, AbotError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "spelling corpus not found, skipping");
            Ok(String::new())
        }
        Err(e) => Err(AbotError::Config(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

impl WordLists {
    /// Load every list from `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self, AbotError> {
        let ner: PathBuf = data_dir.join("ner");
        let spell: PathBuf = data_dir.join("spell");
        let lists = Self {
            nouns: lines(&read_required(&ner.join("nouns.txt"))?),
            verbs: lines(&read_required(&ner.join("verbs.txt"))?),
            adjectives: lines(&read_required(&ner.join("adjectives.txt"))?),
            adverbs: lines(&read_required(&ner.join("adverbs.txt"))?),
            names_male: lines(&read_required(&ner.join("names_male.txt"))?),
            names_female: lines(&read_required(&ner.join("names_female.txt"))?),
            offensive: lines(&read_required(&data_dir.join("offensive.txt"))?),
            frequency_corpus: read_optional(&spell.join("coca.txt"))?,
            dictionary: lines(&read_optional(&spell.join("american-english.txt"))?),
        };
        debug!(
            dir = %data_dir.display(),
            nouns = lists.nouns.len(),
            verbs = lists.verbs.len(),
            names = lists.names_male.len() + lists.names_female.len(),
            "loaded word lists"
        );
        Ok(lists)
    }
}
