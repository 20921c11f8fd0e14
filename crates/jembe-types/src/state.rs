//! Closed-shape component state.
//!
//! A [`ComponentState`] is the per-instance state bag round-tripped
//! through the client. Its key set is fixed at construction (the
//! component's state params); writes to unknown keys fail with
//! [`JembeError::StateShapeViolation`] and keys can never be removed.
//!
//! Keys computed by `inject()` are marked injected: they participate in
//! reads and writes server-side but are omitted from [`to_json`], so
//! they are never sent to the client.
//!
//! [`to_json`]: ComponentState::to_json

use crate::error::JembeError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Per-instance state bag with a fixed key set.
///
/// Equality is value equality; the injected marker set does not
/// participate, so a state loaded from the client compares equal to
/// the same state after `inject()` re-supplied identical values.
///
/// # Example
///
/// ```
/// use jembe_types::ComponentState;
/// use serde_json::json;
///
/// let mut state = ComponentState::new("/cpage/counter", ["value"]);
/// state.set("value", json!(0)).unwrap();
/// assert!(state.set("unknown", json!(1)).is_err());
/// assert_eq!(state.to_json(), json!({"value": 0}));
/// ```
#[derive(Debug, Clone)]
pub struct ComponentState {
    /// Exec name (or full name at config time), for diagnostics only.
    owner: String,
    values: BTreeMap<String, Value>,
    injected: BTreeSet<String>,
}

impl ComponentState {
    /// Creates a state bag whose shape is exactly `keys`, all `null`.
    #[must_use]
    pub fn new<I, S>(owner: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owner: owner.into(),
            values: keys.into_iter().map(|k| (k.into(), Value::Null)).collect(),
            injected: BTreeSet::new(),
        }
    }

    /// Reads a value; `None` only for keys outside the shape.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Writes a value in place.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::StateShapeViolation`] for keys outside the
    /// fixed shape. Deletion is not provided at all; the shape is closed
    /// in both directions.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), JembeError> {
        match self.values.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(JembeError::StateShapeViolation {
                exec_name: self.owner.clone(),
                param: key.to_string(),
            }),
        }
    }

    /// `true` when `key` belongs to the shape.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates the fixed key set in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates `(key, value)` pairs in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Marks `key` as injected (server-computed, never serialised).
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::StateShapeViolation`] for keys outside the
    /// shape.
    pub fn mark_injected(&mut self, key: &str) -> Result<(), JembeError> {
        if !self.values.contains_key(key) {
            return Err(JembeError::StateShapeViolation {
                exec_name: self.owner.clone(),
                param: key.to_string(),
            });
        }
        self.injected.insert(key.to_string());
        Ok(())
    }

    /// `true` when `key` is computed by `inject()`.
    #[must_use]
    pub fn is_injected(&self, key: &str) -> bool {
        self.injected.contains(key)
    }

    /// The injected key subset.
    pub fn injected_keys(&self) -> impl Iterator<Item = &str> {
        self.injected.iter().map(String::as_str)
    }

    /// Serialises the client-visible state: every key except the
    /// injected ones.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (k, v) in &self.values {
            if !self.injected.contains(k) {
                map.insert(k.clone(), v.clone());
            }
        }
        Value::Object(map)
    }

    /// Deep copy for snapshotting before mutation.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    // Convenience typed reads for action bodies.

    /// Reads an integer value, `None` for missing or non-integer.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    /// Reads a string value, `None` for missing or non-string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Reads a bool value, `None` for missing or non-bool.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }
}

impl PartialEq for ComponentState {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for ComponentState {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter_state() -> ComponentState {
        let mut s = ComponentState::new("/cpage/counter", ["value", "user"]);
        s.set("value", json!(3)).unwrap();
        s.set("user", json!("ana")).unwrap();
        s
    }

    #[test]
    fn set_unknown_key_fails() {
        let mut s = counter_state();
        let err = s.set("nope", json!(1)).unwrap_err();
        assert!(matches!(err, JembeError::StateShapeViolation { param, .. } if param == "nope"));
    }

    #[test]
    fn to_json_omits_injected() {
        let mut s = counter_state();
        s.mark_injected("user").unwrap();
        assert_eq!(s.to_json(), json!({"value": 3}));
        // Injected values are still readable server-side.
        assert_eq!(s.get_str("user"), Some("ana"));
    }

    #[test]
    fn equality_ignores_injection_marks() {
        let a = counter_state();
        let mut b = counter_state();
        b.mark_injected("user").unwrap();
        assert_eq!(a, b);

        b.set("value", json!(4)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn deep_copy_is_independent() {
        let mut a = counter_state();
        let snapshot = a.deep_copy();
        a.set("value", json!(99)).unwrap();
        assert_eq!(snapshot.get_i64("value"), Some(3));
        assert_ne!(a, snapshot);
    }

    #[test]
    fn mark_injected_respects_shape() {
        let mut s = counter_state();
        assert!(s.mark_injected("ghost").is_err());
    }

    #[test]
    fn shape_is_fixed_at_construction() {
        let s = ComponentState::new("/p", ["a", "b"]);
        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(s.get("a"), Some(&Value::Null));
    }
}
