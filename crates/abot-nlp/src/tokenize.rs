// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentence tokenizer.
//!
//! Splits on whitespace, then breaks punctuation out into its own tokens.
//! `.` and `,` stay attached when followed by a digit so prices and
//! decimals survive (`$3.50`, `1,000`). Contractions are split but not
//! expanded: `let's` becomes `let`, `'`, `s`.

fn is_marker(c: char, next: Option<char>) -> bool {
    match c {
        '\'' | '"' | ':' | ';' | '!' | '?' => true,
        '.' | ',' => !next.is_some_and(|n| n.is_ascii_digit()),
        _ => false,
    }
}

/// Break a sentence into word and punctuation tokens.
pub fn tokenize(sentence: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in sentence.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        let mut piece = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if is_marker(c, chars.get(i + 1).copied()) {
                if !piece.is_empty() {
                    tokens.push(std::mem::take(&mut piece));
                }
                tokens.push(c.to_string());
            } else {
                piece.push(c);
            }
        }
        if !piece.is_empty() {
            tokens.push(piece);
        }
    }
    tokens
}

/// True for single-character punctuation tokens the stemmer skips.
pub fn is_punctuation(token: &str) -> bool {
    matches!(token, "'" | "\"" | "," | "." | ":" | ";" | "!" | "?")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn punctuation_becomes_tokens() {
        assert_eq!(toks("Hi! How are you?"), vec!["Hi", "!", "How", "are", "you", "?"]);
    }

    #[test]
    fn contractions_split_without_expansion() {
        assert_eq!(toks("let's go"), vec!["let", "'", "s", "go"]);
        assert_eq!(toks("How're you"), vec!["How", "'", "re", "you"]);
    }

    #[test]
    fn decimals_and_thousands_stay_whole() {
        assert_eq!(toks("it costs $3.50"), vec!["it", "costs", "$3.50"]);
        assert_eq!(toks("1,000 people"), vec!["1,000", "people"]);
    }

    #[test]
    fn trailing_period_and_comma_split() {
        assert_eq!(toks("Yes, at 3."), vec!["Yes", ",", "at", "3", "."]);
    }

    #[test]
    fn clock_colon_is_split() {
        assert_eq!(toks("3:30pm"), vec!["3", ":", "30pm"]);
    }

    #[test]
    fn empty_and_whitespace_only() {
        assert!(toks("").is_empty());
        assert!(toks("   \t ").is_empty());
    }

    #[test]
    fn multiple_markers_in_one_word() {
        assert_eq!(toks("\"what?!\""), vec!["\"", "what", "?", "!", "\""]);
    }

    proptest::proptest! {
        #[test]
        fn tokens_never_contain_whitespace_or_are_empty(s in ".{0,64}") {
            for t in tokenize(&s) {
                proptest::prop_assert!(!t.is_empty());
                proptest::prop_assert!(!t.chars().any(char::is_whitespace));
            }
        }
    }
}
