//! Per-evaluation side channel for question-asserted values.

use kiwi_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values supplied by the question rather than computed from the scene.
///
/// `query_text_q` nodes read from here. The caller fills it for each
/// evaluation; the executor never writes to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    vals: BTreeMap<String, Value>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`RunState::define`].
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.define(key, value);
        self
    }

    /// Bind `key`, replacing any previous value.
    pub fn define(&mut self, key: impl Into<String>, value: Value) {
        self.vals.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vals.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }
}
