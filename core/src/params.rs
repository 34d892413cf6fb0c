//! Parameter store
//!
//! Per-run mapping from parameter name to value. Values are JSON so steps can
//! store strings read from a page as well as numbers produced by expressions.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterStore {
    values: HashMap<String, JsonValue>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    /// Insert or replace a parameter, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.values.insert(name.into(), value)
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

    /// Text form of a parameter, as substituted into templates
    pub fn display(&self, name: &str) -> Option<String> {
        self.get(name).map(display_value)
    }
}

impl From<HashMap<String, JsonValue>> for ParameterStore {
    fn from(values: HashMap<String, JsonValue>) -> Self {
        Self { values }
    }
}

/// Render a value the way it appears inside a step string.
///
/// Strings are inserted raw (no quotes); everything else uses its JSON text,
/// so an integer count renders as `3`, not `3.0`.
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("abc")), "abc");
        assert_eq!(display_value(&json!(3)), "3");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&JsonValue::Null), "null");
    }

    #[test]
    fn test_set_replaces_value() {
        let mut params = ParameterStore::new();
        assert_eq!(params.set("count", json!(0)), None);
        assert_eq!(params.set("count", json!(1)), Some(json!(0)));
        assert_eq!(params.display("count").as_deref(), Some("1"));
        assert_eq!(params.len(), 1);
    }
}
