// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A plugin's view of its conversation state for one owner.
//!
//! The core sends a snapshot with every call; every change made here is
//! also recorded in a [`MemoryDelta`] that travels back in the response and
//! is applied by the core in one transaction.

use std::collections::BTreeMap;

use abot_core::AbotError;
use abot_core::rpc::MemoryDelta;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    values: BTreeMap<String, Vec<u8>>,
    delta: MemoryDelta,
}

impl Memory {
    /// Wrap a snapshot received from the core.
    pub fn new(snapshot: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            values: snapshot,
            delta: MemoryDelta::default(),
        }
    }

    /// Raw bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// True if `key` holds a non-empty value.
    pub fn has(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Upsert raw bytes.
    pub fn set(&mut self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        self.delta.deleted.retain(|k| k != &key);
        self.delta.set.insert(key.clone(), value.clone());
        self.values.insert(key, value);
    }

    /// Upsert any serializable value as JSON.
    pub fn set_json<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), AbotError> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes);
        Ok(())
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: &str) {
        self.set(key, json_bytes(&value));
    }

    pub fn set_int64(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, value.to_string().into_bytes());
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, value.to_string().into_bytes());
    }

    /// A string value. Accepts both JSON strings and raw UTF-8.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let raw = self.get(key)?;
        serde_json::from_slice::<String>(raw)
            .ok()
            .or_else(|| std::str::from_utf8(raw).ok().map(str::to_string))
    }

    pub fn get_int64(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?;
        let parsed = std::str::from_utf8(raw).ok()?.trim().parse().ok();
        if parsed.is_none() {
            debug!(key, "memory is not an int64");
        }
        parsed
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.get(key)?;
        match std::str::from_utf8(raw).ok()?.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => {
                debug!(key, "memory is not a bool");
                None
            }
        }
    }

    /// Decode a JSON value. Missing keys are `Ok(None)`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AbotError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
        }
    }

    /// Remove a key. Removing a missing key is not an error.
    pub fn delete(&mut self, key: &str) {
        self.values.remove(key);
        self.delta.set.remove(key);
        if !self.delta.deleted.iter().any(|k| k == key) {
            self.delta.deleted.push(key.to_string());
        }
    }

    /// Forget everything this plugin knows about the owner.
    pub fn clear(&mut self) {
        self.values.clear();
        self.delta = MemoryDelta {
            cleared: true,
            ..Default::default()
        };
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Changes made since the snapshot was taken.
    pub fn delta(&self) -> &MemoryDelta {
        &self.delta
    }

    pub fn into_delta(self) -> MemoryDelta {
        self.delta
    }
}

fn json_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    // Strings and numbers always serialize.
    serde_json::to_vec(value).unwrap_or_default()
}
