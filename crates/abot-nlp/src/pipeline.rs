// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The full sentence → [`StructuredInput`] pipeline.
//!
//! Tokenize, spell-correct (one task per token), stem, classify. The
//! pipeline holds only read-only tables and never touches storage.

use std::path::Path;
use std::sync::Arc;

use abot_config::model::NlpConfig;
use abot_core::{AbotError, Sex, StructuredInput};
use chrono::NaiveDateTime;
use tracing::info;

use crate::classify::Classifier;
use crate::dictionary::WordLists;
use crate::language::OffensiveSet;
use crate::spell::{SpellModel, correct_tokens};
use crate::stem::Porter2;
use crate::tokenize::tokenize;

const CORPUS_WEIGHT: u64 = 1;
const DICTIONARY_WEIGHT: u64 = 3;

/// Output of [`Pipeline::analyze`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Tokens after spelling correction.
    pub tokens: Vec<String>,
    pub stems: Vec<String>,
    pub structured: StructuredInput,
    /// True when a stem is in the offensive set.
    pub offensive: bool,
}

/// Shared, immutable NLP state built once at boot.
#[derive(Debug)]
pub struct Pipeline {
    classifier: Classifier,
    offensive: OffensiveSet,
    spell: Arc<SpellModel>,
    stemmer: Porter2,
}

impl Pipeline {
    /// Load word lists from the configured data directory.
    pub fn load(config: &NlpConfig) -> Result<Self, AbotError> {
        let lists = WordLists::load(Path::new(&config.data_dir))?;
        Ok(Self::from_word_lists(&lists, config.spell_depth, config.spell_threshold))
    }

    /// Build from lists already in memory.
    pub fn from_word_lists(lists: &WordLists, spell_depth: usize, spell_threshold: u64) -> Self {
        let stemmer = Porter2::default();

        let mut classifier = Classifier::new();
        for w in &lists.verbs {
            classifier.add_command(w);
        }
        for w in lists.nouns.iter().chain(&lists.adjectives).chain(&lists.adverbs) {
            classifier.add_object(w);
        }
        for name in &lists.names_male {
            classifier.add_name(name, Sex::Male);
        }
        for name in &lists.names_female {
            classifier.add_name(name, Sex::Female);
        }

        let offensive = OffensiveSet::new(lists.offensive.iter().map(|w| stemmer.stem(w)));

        let mut spell = SpellModel::new(spell_depth, spell_threshold);
        spell.train_text(&lists.frequency_corpus, CORPUS_WEIGHT);
        for word in lists
            .dictionary
            .iter()
            .chain(&lists.verbs)
            .chain(&lists.nouns)
            .chain(&lists.adjectives)
            .chain(&lists.adverbs)
        {
            spell.train_word(word, DICTIONARY_WEIGHT);
        }

        info!(
            classifier_keys = classifier.len(),
            offensive = offensive.len(),
            spell_words = spell.len(),
            "nlp pipeline ready"
        );

        Self {
            classifier,
            offensive,
            spell: Arc::new(spell),
            stemmer,
        }
    }

    /// Process one sentence.
    pub async fn analyze(&self, sentence: &str, now: NaiveDateTime) -> Analysis {
        let raw = tokenize(sentence);
        let tokens = correct_tokens(&self.spell, &raw).await;
        let stems = self.stemmer.stem_tokens(&tokens);
        let structured = self.classifier.classify(&tokens, &self.stemmer, now);
        let offensive = self.offensive.matches(&stems);
        Analysis {
            tokens,
            stems,
            structured,
            offensive,
        }
    }

    /// True if any stem is in the offensive set.
    pub fn is_offensive(&self, stems: &[String]) -> bool {
        self.offensive.matches(stems)
    }

    pub fn stemmer(&self) -> &Porter2 {
        &self.stemmer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn pipeline() -> Pipeline {
        let lists = WordLists {
            nouns: words(&["pizza", "food"]),
            verbs: words(&["find", "show", "meet"]),
            adverbs: words(&["nearby"]),
            names_male: words(&["jim"]),
            offensive: words(&["darned"]),
            dictionary: words(&["restaurant"]),
            ..Default::default()
        };
        Pipeline::from_word_lists(&lists, 2, 3)
    }

    #[tokio::test]
    async fn misspelled_trigger_is_corrected_then_classified() {
        let a = pipeline().analyze("Find piza nearby", now()).await;
        assert_eq!(a.tokens, vec!["Find", "pizza", "nearby"]);
        assert_eq!(a.stems[..2], ["find", "pizza"]);
        assert_eq!(a.structured.commands, vec!["find"]);
        assert_eq!(a.structured.objects, vec!["pizza", "nearby"]);
        assert!(!a.offensive);
    }

    #[tokio::test]
    async fn offensive_list_is_matched_by_stem() {
        let p = pipeline();
        let a = p.analyze("you darn bot", now()).await;
        assert!(a.offensive);
        assert!(p.is_offensive(&a.stems));
    }

    #[tokio::test]
    async fn times_flow_through() {
        let a = pipeline().analyze("meet me at 3pm", now()).await;
        assert_eq!(a.structured.times.len(), 1);
    }

    #[tokio::test]
    async fn empty_sentence() {
        assert_eq!(pipeline().analyze("", now()).await, Analysis::default());
    }
}
