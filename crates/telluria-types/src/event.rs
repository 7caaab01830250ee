//! Simulation events.
//!
//! Events are append-only within a tick. Subscribers receive copies over
//! bounded channels; the world state keeps a trimmed in-memory tail. `meta`
//! carries machine-readable identifiers as strings for the streaming path --
//! it is not part of the long-term persistence contract beyond the snapshot
//! tail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::EventCategory;

/// A single simulation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Tick at which the event occurred.
    pub tick: u64,
    /// Observer-facing category.
    pub category: EventCategory,
    /// Human-readable description.
    pub description: String,
    /// Machine-readable identifiers (agent ids, settlement ids, amounts).
    pub meta: BTreeMap<String, String>,
}

impl Event {
    /// Create an event with an empty meta map.
    #[must_use]
    pub fn new(tick: u64, category: EventCategory, description: impl Into<String>) -> Self {
        Self {
            tick,
            category,
            description: description.into(),
            meta: BTreeMap::new(),
        }
    }

    /// Attach one meta key/value pair (builder style).
    #[must_use]
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.meta.insert(key.to_owned(), value.to_string());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_meta() {
        let event = Event::new(5, EventCategory::Political, "a settlement fell")
            .with("settlement", 3)
            .with("treasury", 120);
        assert_eq!(event.meta.get("settlement").map(String::as_str), Some("3"));
        assert_eq!(event.meta.len(), 2);
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&EventCategory::Gardener).unwrap();
        assert_eq!(json, "\"gardener\"");
    }
}
