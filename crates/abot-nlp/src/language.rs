// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned replies: niceties, refusals, help and confusion.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

/// Reply sent instead of routing when a message contains offensive language.
pub const OFFENSE_REPLY: &str = "I'm sorry, but I don't respond to rude language.";

const CONFUSED: [&str; 4] = [
    "I'm not sure I understand you.",
    "I'm sorry, I don't understand that.",
    "Uh, what are you telling me to do?",
    "What should I do?",
];

/// Response to small talk the core answers itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nicety {
    Reply(&'static str),
    /// Acknowledged without a reply.
    Silent,
}

/// Look for small talk among Porter2 stems. The first matching stem wins.
pub fn nicety(stems: &[String]) -> Option<Nicety> {
    stems.iter().find_map(|stem| match stem.as_str() {
        "thank" => Some(Nicety::Reply("You're welcome!")),
        "cool" | "sweet" | "awesom" | "neat" | "perfect" => Some(Nicety::Reply("I know!")),
        "sorri" => Some(Nicety::Reply("That's OK. I forgive you.")),
        "hi" | "hello" => Some(Nicety::Reply("Hi there. :)")),
        "ok" | "okay" | "k" => Some(Nicety::Silent),
        _ => None,
    })
}

/// A randomly chosen "I didn't get that" sentence.
pub fn confused() -> &'static str {
    CONFUSED[rand::thread_rng().gen_range(0..CONFUSED.len())]
}

/// Every sentence [`confused`] may return.
pub fn confused_replies() -> &'static [&'static str] {
    &CONFUSED
}

/// Suggest example sentences when the user asks for help.
///
/// Returns `None` unless the only command is `help` and there is at least
/// one usage example to offer.
pub fn help_reply(commands: &[String], usages: &[String]) -> Option<String> {
    if commands.len() != 1 || commands[0] != "help" {
        return None;
    }
    let mut rng = rand::thread_rng();
    let picked: Vec<&String> = usages.choose_multiple(&mut rng, 2).collect();
    match picked.as_slice() {
        [] => None,
        [one] => Some(format!("Try telling me {one:?}")),
        [a, b, ..] => Some(format!("Try telling me {a:?} or {b:?}")),
    }
}

/// Stems the core refuses to respond to.
#[derive(Debug, Default)]
pub struct OffensiveSet {
    stems: HashSet<String>,
}

impl OffensiveSet {
    pub fn new(stems: impl IntoIterator<Item = String>) -> Self {
        Self {
            stems: stems.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// True if any stem is offensive.
    pub fn matches(&self, stems: &[String]) -> bool {
        stems.iter().any(|s| self.stems.contains(s))
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn niceties_match_stems() {
        assert_eq!(
            nicety(&stems(&["thank", "you"])),
            Some(Nicety::Reply("You're welcome!"))
        );
        assert_eq!(
            nicety(&stems(&["that", "awesom"])),
            Some(Nicety::Reply("I know!"))
        );
        assert_eq!(
            nicety(&stems(&["sorri"])),
            Some(Nicety::Reply("That's OK. I forgive you."))
        );
        assert_eq!(nicety(&stems(&["ok"])), Some(Nicety::Silent));
        assert_eq!(nicety(&stems(&["find", "pizza"])), None);
    }

    #[test]
    fn confused_is_one_of_four() {
        for _ in 0..20 {
            assert!(CONFUSED.contains(&confused()));
        }
    }

    #[test]
    fn help_needs_help_command_alone() {
        let usages = stems(&["find pizza nearby"]);
        assert_eq!(
            help_reply(&stems(&["help"]), &usages).as_deref(),
            Some("Try telling me \"find pizza nearby\"")
        );
        assert_eq!(help_reply(&stems(&["help", "find"]), &usages), None);
        assert_eq!(help_reply(&stems(&["help"]), &[]), None);
    }

    #[test]
    fn help_offers_two_distinct_examples() {
        let usages = stems(&["a", "b", "c"]);
        let reply = help_reply(&stems(&["help"]), &usages).unwrap();
        assert!(reply.starts_with("Try telling me \""));
        assert!(reply.contains("\" or \""));
    }

    #[test]
    fn offensive_matching() {
        let set = OffensiveSet::new(stems(&["darn"]));
        assert!(set.matches(&stems(&["you", "darn", "bot"])));
        assert!(!set.matches(&stems(&["nice", "bot"])));
    }
}
