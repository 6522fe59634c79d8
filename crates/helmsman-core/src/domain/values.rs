//! Value mapping handed to the release engine.
//!
//! Keys are dotted paths (`image.tag`); `to_nested` expands them into the
//! values document the chart consumes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::desired::AssistantSpec;

pub const IMAGE_TAG: &str = "image.tag";
pub const SECRET_API_KEY: &str = "secret.apiKey";
pub const REPLICAS_FRONTEND: &str = "replicas.frontend";
pub const REPLICAS_BACKEND: &str = "replicas.backend";

/// A single scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    String(String),
}

impl Value {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Int(n) => JsonValue::from(*n),
            Value::String(s) => JsonValue::from(s.as_str()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

/// Flat mapping from dotted path to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMapping {
    entries: BTreeMap<String, Value>,
}

impl ValueMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(path.into(), value.into());
    }

    pub fn with(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand dotted paths into nested objects.
    ///
    /// When a path passes through a scalar set by a shorter path, the
    /// longer path wins and the scalar is replaced by an object.
    pub fn to_nested(&self) -> JsonValue {
        let mut root = Map::new();
        for (path, value) in &self.entries {
            let segments: Vec<&str> = path.split('.').collect();
            insert_path(&mut root, &segments, value.to_json());
        }
        JsonValue::Object(root)
    }
}

fn insert_path(map: &mut Map<String, JsonValue>, segments: &[&str], leaf: JsonValue) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), leaf);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !child.is_object() {
                *child = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(inner) = child {
                insert_path(inner, rest, leaf);
            }
        }
    }
}

/// Translate a spec into the values the release engine expects.
///
/// Pure and total: empty or out-of-range fields pass through untouched.
pub fn map_values(spec: &AssistantSpec) -> ValueMapping {
    ValueMapping::new()
        .with(IMAGE_TAG, spec.version.as_str())
        .with(SECRET_API_KEY, spec.api_key_secret_ref.as_str())
        .with(REPLICAS_FRONTEND, spec.replicas.frontend)
        .with(REPLICAS_BACKEND, spec.replicas.backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_spec_fields_to_fixed_paths() {
        let spec = AssistantSpec::new("1.2.3", "sec-a").with_replicas(2, 3);
        let values = map_values(&spec);

        let expected = ValueMapping::new()
            .with("image.tag", "1.2.3")
            .with("secret.apiKey", "sec-a")
            .with("replicas.frontend", 2)
            .with("replicas.backend", 3);
        assert_eq!(values, expected);
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn empty_and_negative_values_pass_through() {
        let spec = AssistantSpec::new("", "").with_replicas(-1, 0);
        let values = map_values(&spec);
        assert_eq!(values.get(IMAGE_TAG), Some(&Value::String(String::new())));
        assert_eq!(values.get(REPLICAS_FRONTEND), Some(&Value::Int(-1)));
        assert_eq!(values.get(REPLICAS_BACKEND), Some(&Value::Int(0)));
    }

    #[test]
    fn nested_document_matches_chart_layout() {
        let spec = AssistantSpec::new("1.2.3", "sec-a").with_replicas(2, 3);
        assert_eq!(
            map_values(&spec).to_nested(),
            json!({
                "image": { "tag": "1.2.3" },
                "secret": { "apiKey": "sec-a" },
                "replicas": { "frontend": 2, "backend": 3 },
            })
        );
    }

    #[test]
    fn longer_path_replaces_scalar() {
        let values = ValueMapping::new().with("a", "x").with("a.b", 1);
        assert_eq!(values.to_nested(), json!({ "a": { "b": 1 } }));
    }
}
