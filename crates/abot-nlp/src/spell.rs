// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frequency-weighted spelling correction.
//!
//! Words are indexed by every string reachable through up to `depth`
//! character deletions (symmetric delete). A lookup generates the same
//! deletions for the input, collects indexed words, and keeps those whose
//! Levenshtein distance is within `depth` and whose trained weight reaches
//! `threshold`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use regex::Regex;
use tracing::debug;

/// Tokens shorter than this are never corrected.
const MIN_CORRECTABLE_LEN: usize = 3;

static WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new("[a-zA-Z]+").unwrap());

/// Trained spelling model. Immutable once training finishes.
#[derive(Debug, Default)]
pub struct SpellModel {
    depth: usize,
    threshold: u64,
    counts: HashMap<String, u64>,
    deletes: HashMap<String, Vec<String>>,
}

fn deletions(word: &str, depth: usize) -> HashSet<String> {
    let mut out = HashSet::new();
    out.insert(word.to_string());
    let mut frontier = vec![word.to_string()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for w in &frontier {
            let chars: Vec<char> = w.chars().collect();
            for i in 0..chars.len() {
                let d: String = chars
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, c)| *c)
                    .collect();
                if out.insert(d.clone()) {
                    next.push(d);
                }
            }
        }
        frontier = next;
    }
    out
}

impl SpellModel {
    pub fn new(depth: usize, threshold: u64) -> Self {
        Self {
            depth,
            threshold,
            ..Default::default()
        }
    }

    /// Add `weight` occurrences of `word`.
    pub fn train_word(&mut self, word: &str, weight: u64) {
        let word = word.to_lowercase();
        if word.is_empty() {
            return;
        }
        let count = self.counts.entry(word.clone()).or_insert(0);
        let first = *count == 0;
        *count += weight;
        if first {
            for d in deletions(&word, self.depth) {
                self.deletes.entry(d).or_default().push(word.clone());
            }
        }
    }

    /// Train every alphabetic run in `text` with `weight`.
    pub fn train_text(&mut self, text: &str, weight: u64) {
        for m in WORDS.find_iter(text) {
            self.train_word(m.as_str(), weight);
        }
    }

    /// Trained weight of a word, 0 when unknown.
    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(&word.to_lowercase()).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Best correction for `token`, or `token` itself when it is known,
    /// not purely alphabetic, too short, or has no candidate.
    pub fn correct(&self, token: &str) -> String {
        if token.chars().count() < MIN_CORRECTABLE_LEN
            || !token.chars().all(|c| c.is_ascii_alphabetic())
        {
            return token.to_string();
        }
        let lower = token.to_lowercase();
        if self.counts.contains_key(&lower) {
            return token.to_string();
        }

        let mut best: Option<(usize, u64, &str)> = None;
        for d in deletions(&lower, self.depth) {
            let Some(words) = self.deletes.get(&d) else {
                continue;
            };
            for word in words {
                let count = self.counts.get(word).copied().unwrap_or(0);
                if count < self.threshold {
                    continue;
                }
                let dist = strsim::levenshtein(&lower, word);
                if dist == 0 || dist > self.depth {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((bd, bc, bw)) => {
                        dist < bd
                            || (dist == bd && count > bc)
                            || (dist == bd && count == bc && word.as_str() < bw)
                    }
                };
                if better {
                    best = Some((dist, count, word));
                }
            }
        }

        match best {
            Some((_, _, word)) => {
                debug!(from = %token, to = %word, "spelling corrected");
                word.to_string()
            }
            None => token.to_string(),
        }
    }
}

/// Correct every token concurrently, one task per token, preserving order.
///
/// A task that fails to complete leaves its token unchanged.
pub async fn correct_tokens(model: &Arc<SpellModel>, tokens: &[String]) -> Vec<String> {
    let handles = tokens.iter().cloned().map(|token| {
        let model = Arc::clone(model);
        tokio::spawn(async move { model.correct(&token) })
    });
    join_all(handles)
        .await
        .into_iter()
        .zip(tokens)
        .map(|(result, original)| result.unwrap_or_else(|_| original.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SpellModel {
        let mut m = SpellModel::new(2, 4);
        m.train_word("pizza", 3);
        m.train_text("pizza pizza nearby restaurant restaurant", 1);
        m.train_word("restaurant", 3);
        m.train_word("pizzeria", 1);
        m.train_word("nearby", 3);
        m
    }

    #[test]
    fn known_words_are_kept() {
        let m = model();
        assert_eq!(m.correct("pizza"), "pizza");
        assert_eq!(m.correct("Pizza"), "Pizza");
    }

    #[test]
    fn close_misspelling_is_corrected() {
        let m = model();
        assert_eq!(m.correct("piza"), "pizza");
        assert_eq!(m.correct("restuarant"), "restaurant");
    }

    #[test]
    fn candidates_below_threshold_are_ignored() {
        let m = model();
        // pizzeria has weight 1, below the threshold of 4.
        assert_eq!(m.correct("pizzeri"), "pizzeri");
    }

    #[test]
    fn non_alphabetic_and_short_tokens_pass_through() {
        let m = model();
        assert_eq!(m.correct("3pm"), "3pm");
        assert_eq!(m.correct("?"), "?");
        assert_eq!(m.correct("pz"), "pz");
    }

    #[test]
    fn far_words_are_not_corrected() {
        let m = model();
        assert_eq!(m.correct("zzzzzz"), "zzzzzz");
    }

    #[test]
    fn train_text_counts_each_occurrence() {
        let m = model();
        assert_eq!(m.count("pizza"), 5);
        assert_eq!(m.count("unknown"), 0);
    }

    #[tokio::test]
    async fn parallel_correction_preserves_order() {
        let m = Arc::new(model());
        let tokens: Vec<String> = ["find", "piza", "nerby", "!"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = correct_tokens(&m, &tokens).await;
        assert_eq!(out, vec!["find", "pizza", "nearby", "!"]);
    }
}
