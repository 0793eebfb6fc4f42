//! # Hand-off
//!
//! Run-scoped values steps emit for their successors, keyed by the emitting
//! step and a key. Nothing here outlives the run.

use dashmap::DashMap;
use serde_json::Value;

use crate::constants::RETURN_VALUE_KEY;

#[derive(Debug, Default)]
pub struct HandOff {
    values: DashMap<(String, String), Value>,
}

impl HandOff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: &str, key: &str, value: Value) {
        self.values
            .insert((step.to_string(), key.to_string()), value);
    }

    pub fn pull(&self, step: &str, key: &str) -> Option<Value> {
        self.values
            .get(&(step.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Store the value a step returned
    pub fn push_return(&self, step: &str, value: Value) {
        self.push(step, RETURN_VALUE_KEY, value);
    }

    /// Value a step returned, if it returned one
    pub fn pull_return(&self, step: &str) -> Option<Value> {
        self.pull(step, RETURN_VALUE_KEY)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_return_values_are_scoped_by_step() {
        let handoff = HandOff::new();
        handoff.push_return("pick_medal", json!("Gold"));

        assert_eq!(handoff.pull_return("pick_medal"), Some(json!("Gold")));
        assert_eq!(handoff.pull_return("pick_medal_task"), None);
        assert_eq!(handoff.pull("pick_medal", "other"), None);
    }

    #[test]
    fn test_push_overwrites() {
        let handoff = HandOff::new();
        handoff.push("a", "k", json!(1));
        handoff.push("a", "k", json!(2));

        assert_eq!(handoff.pull("a", "k"), Some(json!(2)));
        assert_eq!(handoff.len(), 1);
    }
}
