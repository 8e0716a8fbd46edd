//! Persisted "already notified today" markers.
//!
//! # Responsibility
//! - Map item ids to the date of their last expiry notification.
//! - Load leniently: absent or corrupted state reads as an empty mapping.
//!
//! # Invariants
//! - A marker equal to today's date key suppresses a same-day re-send.
//! - Markers for any other date never suppress anything.
//! - `clear` removes the slot; loading afterwards yields an empty mapping.

use crate::expiry::classify::date_key;
use crate::model::item::ItemId;
use crate::store::slot::{KeyValueSlot, SlotResult};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Logical slot name holding the marker mapping.
pub const DEFAULT_MARKER_SLOT: &str = "notified_markers";

/// Flag store shared between the tracker and the day-boundary task.
pub type SharedFlagStore = Arc<Mutex<PersistentFlagStore>>;

/// Item id to last-notified date key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotifiedMarkers {
    entries: BTreeMap<String, String>,
}

impl NotifiedMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the stored date key for `id`.
    pub fn get(&self, id: ItemId) -> Option<&str> {
        self.entries.get(&id.to_string()).map(String::as_str)
    }

    /// Returns whether `id` was notified on the day `key`.
    pub fn is_marked_on(&self, id: ItemId, key: &str) -> bool {
        self.get(id) == Some(key)
    }

    pub fn mark(&mut self, id: ItemId, key: impl Into<String>) {
        self.entries.insert(id.to_string(), key.into());
    }

    /// Drops every entry not dated `key`; returns how many were dropped.
    pub fn retain_date(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, value| value == key);
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, key)| (id.as_str(), key.as_str()))
    }

    /// Builds markers from untrusted JSON.
    ///
    /// Non-object values read as an empty mapping and entries whose value is
    /// not a string are dropped. Both cases log a warning.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            warn!(
                "event=markers_parse module=store status=malformed error_code=not_a_mapping kind={}",
                json_kind(value)
            );
            return Self::default();
        };

        let mut markers = Self::default();
        let mut dropped = 0_usize;
        for (id, date) in object {
            match date.as_str() {
                Some(date) => {
                    markers.entries.insert(id.clone(), date.to_string());
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                "event=markers_parse module=store status=malformed error_code=bad_entries dropped={dropped}"
            );
        }
        markers
    }

    /// Parses markers from slot text with the same leniency as [`Self::from_value`].
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                warn!(
                    "event=markers_parse module=store status=malformed error_code=invalid_json line={} column={}",
                    err.line(),
                    err.column()
                );
                Self::default()
            }
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Marker persistence over one named slot.
pub struct PersistentFlagStore {
    slot: Box<dyn KeyValueSlot>,
    slot_name: String,
}

impl PersistentFlagStore {
    /// Creates a store over `slot` using [`DEFAULT_MARKER_SLOT`].
    pub fn new(slot: impl KeyValueSlot + 'static) -> Self {
        Self {
            slot: Box::new(slot),
            slot_name: DEFAULT_MARKER_SLOT.to_string(),
        }
    }

    pub fn with_slot_name(mut self, slot_name: impl Into<String>) -> Self {
        self.slot_name = slot_name.into();
        self
    }

    pub fn slot_name(&self) -> &str {
        &self.slot_name
    }

    /// Wraps the store for sharing with the day-boundary scheduler.
    pub fn into_shared(self) -> SharedFlagStore {
        Arc::new(Mutex::new(self))
    }

    /// Loads all markers.
    ///
    /// Never fails: a missing slot, unreadable storage or malformed content
    /// all read as an empty mapping.
    pub fn load(&self) -> NotifiedMarkers {
        match self.slot.read(&self.slot_name) {
            Ok(Some(raw)) => NotifiedMarkers::from_json_str(&raw),
            Ok(None) => NotifiedMarkers::default(),
            Err(err) => {
                warn!(
                    "event=markers_load module=store status=error slot={} error={err}",
                    self.slot_name
                );
                NotifiedMarkers::default()
            }
        }
    }

    /// Loads markers and discards entries not dated `today`.
    ///
    /// Covers restarts that missed a midnight reset: yesterday's markers
    /// must not suppress today's notifications.
    pub fn load_current(&self, today: NaiveDate) -> NotifiedMarkers {
        let mut markers = self.load();
        let discarded = markers.retain_date(&date_key(today));
        if discarded > 0 {
            debug!(
                "event=markers_load module=store status=ok discarded_stale={discarded} kept={}",
                markers.len()
            );
        }
        markers
    }

    pub fn save(&self, markers: &NotifiedMarkers) -> SlotResult<()> {
        self.slot.write(&self.slot_name, &markers.to_json_string())
    }

    /// Removes the marker slot entirely.
    pub fn clear(&self) -> SlotResult<()> {
        self.slot.remove(&self.slot_name)?;
        info!(
            "event=markers_clear module=store status=ok slot={}",
            self.slot_name
        );
        Ok(())
    }
}
