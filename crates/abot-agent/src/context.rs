// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context: the last times and people an owner talked about.
//!
//! "Then" picks up the last non-empty list of times; pronouns pick up the
//! last non-empty list of people. Both lists are kept in the core's own
//! slice of the state table (empty plugin name).

use std::collections::BTreeMap;

use abot_core::rpc::MemoryDelta;
use abot_core::{AbotError, Owner, Person, Sex, StructuredInput};
use abot_storage::queries::states;
use abot_storage::Database;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

pub const CONTEXT_TIME_KEY: &str = "__contextTime";
pub const CONTEXT_PEOPLE_KEY: &str = "__contextPeople";

const CONTEXT_KEYS: [&str; 2] = [CONTEXT_TIME_KEY, CONTEXT_PEOPLE_KEY];

/// Plugin name under which the core keeps its own state.
const CORE_SCOPE: &str = "";

pub fn is_context_key(key: &str) -> bool {
    CONTEXT_KEYS.contains(&key)
}

/// Which remembered people a pronoun refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeopleFilter {
    /// "us", "them": everyone.
    All,
    /// "he", "she": one person of that sex. Both in one sentence gives
    /// `Sex::Either`, meaning the first remembered person.
    One(Sex),
}

/// Inspect stems for pronouns.
pub fn pronoun_filter(stems: &[String]) -> Option<PeopleFilter> {
    let mut found = false;
    let mut singular = false;
    let mut sex = Sex::Invalid;
    for stem in stems {
        match stem.as_str() {
            "us" | "them" => found = true,
            "he" | "him" => {
                found = true;
                singular = true;
                sex = match sex {
                    Sex::Female | Sex::Either => Sex::Either,
                    _ => Sex::Male,
                };
            }
            "she" | "her" => {
                found = true;
                singular = true;
                sex = match sex {
                    Sex::Male | Sex::Either => Sex::Either,
                    _ => Sex::Female,
                };
            }
            _ => {}
        }
    }
    match (found, singular) {
        (false, _) => None,
        (true, false) => Some(PeopleFilter::All),
        (true, true) => Some(PeopleFilter::One(sex)),
    }
}

/// Narrow remembered people by a pronoun filter.
pub fn select_people(people: Vec<Person>, filter: PeopleFilter) -> Vec<Person> {
    match filter {
        PeopleFilter::All => people,
        PeopleFilter::One(Sex::Either) => people.into_iter().take(1).collect(),
        PeopleFilter::One(sex) => people
            .into_iter()
            .find(|p| p.sex == sex || p.sex == Sex::Either)
            .into_iter()
            .collect(),
    }
}

/// Fill empty `times`/`people` from the owner's context.
pub async fn add_context(
    db: &Database,
    owner: &Owner,
    si: &mut StructuredInput,
    stems: &[String],
) -> Result<(), AbotError> {
    if si.times.is_empty() && stems.iter().any(|s| s == "then") {
        if let Some(times) = load::<Vec<NaiveDateTime>>(db, owner, CONTEXT_TIME_KEY).await? {
            debug!(count = times.len(), "times from context");
            si.times = times;
        }
    }
    if si.people.is_empty()
        && let Some(filter) = pronoun_filter(stems)
        && let Some(people) = load::<Vec<Person>>(db, owner, CONTEXT_PEOPLE_KEY).await?
    {
        si.people = select_people(people, filter);
        debug!(count = si.people.len(), ?filter, "people from context");
    }
    Ok(())
}

/// Remember the current non-empty `times` and `people`.
pub async fn save_context(
    db: &Database,
    owner: &Owner,
    si: &StructuredInput,
) -> Result<(), AbotError> {
    if !si.times.is_empty() {
        let value = serde_json::to_vec(&si.times)?;
        states::set_state(db, owner, CORE_SCOPE, CONTEXT_TIME_KEY, value).await?;
    }
    if !si.people.is_empty() {
        let value = serde_json::to_vec(&si.people)?;
        states::set_state(db, owner, CORE_SCOPE, CONTEXT_PEOPLE_KEY, value).await?;
    }
    Ok(())
}

/// The owner's raw context values, as handed to plugins alongside their own
/// memory.
pub async fn snapshot(
    db: &Database,
    owner: &Owner,
) -> Result<BTreeMap<String, Vec<u8>>, AbotError> {
    let mut out = BTreeMap::new();
    for key in CONTEXT_KEYS {
        if let Some(value) = states::get_state(db, owner, CORE_SCOPE, key).await? {
            out.insert(key.to_string(), value);
        }
    }
    Ok(out)
}

/// Drop context keys from a plugin's memory changes. Context is read-only to
/// plugins; returns how many changes were dropped.
pub fn strip_context_keys(delta: &mut MemoryDelta) -> usize {
    let before = delta.set.len() + delta.deleted.len();
    delta.set.retain(|key, _| !is_context_key(key));
    delta.deleted.retain(|key| !is_context_key(key));
    before - delta.set.len() - delta.deleted.len()
}

async fn load<T: serde::de::DeserializeOwned>(
    db: &Database,
    owner: &Owner,
    key: &str,
) -> Result<Option<T>, AbotError> {
    let Some(raw) = states::get_state(db, owner, CORE_SCOPE, key).await? else {
        return Ok(None);
    };
    match serde_json::from_slice(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable context");
            Ok(None)
        }
    }
}
