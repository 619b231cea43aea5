//! The per-run variable store shared by every action in a workflow.

use std::collections::{HashMap, hash_map};

use serde_json::Value as JsonValue;

use crate::Value;

/// Mapping from case-sensitive variable name to [`Value`].
///
/// The host creates one store per workflow run and lends it to each action
/// phase in turn, so the store itself carries no locking.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store from a JSON object, converting each entry with [`Value::from_json`].
    pub fn from_json_map(map: &serde_json::Map<String, JsonValue>) -> Self {
        let values = map.iter().map(|(name, value)| (name.clone(), Value::from_json(value))).collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Stores `value` under `name`, returning the value it replaced.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Variable names in sorted order, handy for diagnostics.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<'a> IntoIterator for &'a VariableStore {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect(),
        }
    }
}
