// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extract absolute times from a stretch of natural language.
//!
//! Understands clock times (`3pm`, `3:30 pm`, `at 3`, `noon`, `midnight`),
//! relative days (`today`, `tomorrow`, `yesterday`, weekday names,
//! `next week`), short dates (`4/12`) and `now`. A clock time with no
//! meridiem is ambiguous and yields both the AM and the PM reading.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?(am|pm)?$").unwrap());

static SHORT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

impl Clock {
    /// Every wall-clock reading of this time, AM first.
    fn readings(self) -> Vec<NaiveTime> {
        let hours: Vec<u32> = match (self.meridiem, self.hour) {
            (Some(Meridiem::Am), 12) => vec![0],
            (Some(Meridiem::Am), h) => vec![h],
            (Some(Meridiem::Pm), 12) => vec![12],
            (Some(Meridiem::Pm), h) => vec![h + 12],
            (None, 12) => vec![0, 12],
            (None, h @ 1..=11) => vec![h, h + 12],
            (None, h) => vec![h],
        };
        hours
            .into_iter()
            .filter_map(|h| NaiveTime::from_hms_opt(h, self.minute, 0))
            .collect()
    }
}

fn weekday(word: &str) -> Option<Weekday> {
    Some(match word {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    })
}

/// Lowercase, drop noise punctuation and glue split clock tokens back
/// together (`3 : 30` → `3:30`, `3 pm` → `3pm`, `p.m.` → `pm`).
fn normalize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .replace("a.m", "am")
        .replace("p.m", "pm")
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '(' | ')' | '\'' | '!' | '?'))
        .collect();

    let mut words: Vec<String> = Vec::new();
    let raw: Vec<&str> = cleaned.split_whitespace().collect();
    let mut i = 0;
    while i < raw.len() {
        let word = raw[i];
        let is_num = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if i + 2 < raw.len() && is_num(word) && raw[i + 1] == ":" {
            words.push(format!("{word}:{}", raw[i + 2]));
            i += 3;
            continue;
        }
        if let Some(last) = words.last_mut() {
            let ends_numeric = last.chars().last().is_some_and(|c| c.is_ascii_digit());
            let spaced = matches!(word, "a" | "p") && raw.get(i + 1) == Some(&"m");
            if ends_numeric && (matches!(word, "am" | "pm") || spaced) {
                last.push_str(if word.starts_with('a') { "am" } else { "pm" });
                i += if spaced { 2 } else { 1 };
                continue;
            }
        }
        if let Some((h, m)) = word.split_once(':') {
            // "3:" + "30pm"
            if is_num(h) && m.is_empty() && i + 1 < raw.len() {
                words.push(format!("{h}:{}", raw[i + 1]));
                i += 2;
                continue;
            }
        }
        words.push(word.to_string());
        i += 1;
    }
    words
}

fn parse_clock(word: &str, prev: Option<&str>, next: Option<&str>, alone: bool) -> Option<Clock> {
    match word {
        "noon" | "midday" => {
            return Some(Clock {
                hour: 12,
                minute: 0,
                meridiem: Some(Meridiem::Pm),
            });
        }
        "midnight" => {
            return Some(Clock {
                hour: 12,
                minute: 0,
                meridiem: Some(Meridiem::Am),
            });
        }
        _ => {}
    }
    let caps = CLOCK.captures(word)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let meridiem = caps.get(3).map(|m| match m.as_str() {
        "am" => Meridiem::Am,
        _ => Meridiem::Pm,
    });
    let explicit = meridiem.is_some()
        || caps.get(2).is_some()
        || prev == Some("at")
        || matches!(next, Some("oclock") | Some("o'clock"))
        || alone;
    if !explicit || minute > 59 {
        return None;
    }
    match meridiem {
        Some(_) if !(1..=12).contains(&hour) => None,
        None if hour > 23 => None,
        _ => Some(Clock {
            hour,
            minute,
            meridiem,
        }),
    }
}

fn parse_date(word: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = SHORT_DATE.captures(word)?;
    let month: u32 = caps.get(1)?.as_str().parse().ok()?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year = match caps.get(3) {
        Some(y) => {
            let y: i32 = y.as_str().parse().ok()?;
            if y < 100 { 2000 + y } else { y }
        }
        None => today.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Days to move from `from` to reach `target`. Same weekday means a week
/// away.
fn days_until(from: Weekday, target: Weekday, backwards: bool) -> i64 {
    let from = i64::from(from.num_days_from_monday());
    let target = i64::from(target.num_days_from_monday());
    if backwards {
        let d = (from - target).rem_euclid(7);
        -(if d == 0 { 7 } else { d })
    } else {
        let d = (target - from).rem_euclid(7);
        if d == 0 { 7 } else { d }
    }
}

/// Parse every time mentioned in `text`, relative to `now`.
///
/// Returns an empty vec when nothing time-like is present.
pub fn parse(text: &str, now: NaiveDateTime) -> Vec<NaiveDateTime> {
    let words = normalize(text);
    if words.is_empty() {
        return Vec::new();
    }

    let today = now.date();
    let mut day: Option<NaiveDate> = None;
    let mut clocks: Vec<Clock> = Vec::new();
    let mut saw_now = false;
    let alone = words.len() == 1;

    for (i, word) in words.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|p| words.get(p)).map(String::as_str);
        let next = words.get(i + 1).map(String::as_str);
        match word.as_str() {
            "now" => saw_now = true,
            "today" | "tonight" => day = Some(today),
            "tomorrow" => day = Some(today + Duration::days(1)),
            "yesterday" => day = Some(today - Duration::days(1)),
            "week" if prev == Some("next") => day = Some(today + Duration::days(7)),
            w => {
                if let Some(wd) = weekday(w) {
                    let backwards = matches!(prev, Some("last") | Some("previous"));
                    day = Some(today + Duration::days(days_until(today.weekday(), wd, backwards)));
                } else if let Some(date) = parse_date(w, today) {
                    day = Some(date);
                } else if let Some(clock) = parse_clock(w, prev, next, alone) {
                    clocks.push(clock);
                }
            }
        }
    }

    if clocks.is_empty() {
        return match (day, saw_now) {
            (Some(d), _) => vec![d.and_time(now.time())],
            (None, true) => vec![now],
            (None, false) => Vec::new(),
        };
    }

    let date = day.unwrap_or(today);
    clocks
        .into_iter()
        .flat_map(Clock::readings)
        .map(|t| date.and_time(t))
        .collect()
}
