// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Porter2 (Snowball English) stemming.

use rust_stemmers::{Algorithm, Stemmer};

use crate::tokenize::is_punctuation;

/// Porter2 stemmer over lowercased tokens.
pub struct Porter2 {
    inner: Stemmer,
}

impl Default for Porter2 {
    fn default() -> Self {
        Self {
            inner: Stemmer::create(Algorithm::English),
        }
    }
}

impl Porter2 {
    /// Stem one word. The word is lowercased first.
    pub fn stem(&self, word: &str) -> String {
        self.inner.stem(&word.to_lowercase()).into_owned()
    }

    /// Stem every token, dropping bare punctuation.
    pub fn stem_tokens(&self, tokens: &[String]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| !is_punctuation(t))
            .map(|t| self.stem(t))
            .collect()
    }
}

impl std::fmt::Debug for Porter2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Porter2")
    }
}
