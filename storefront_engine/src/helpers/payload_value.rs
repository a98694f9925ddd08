//! A string-only value tree for webhook payloads.
//!
//! The payment provider signs payloads after turning every leaf into a string, so by the time a payload is
//! canonicalised the only shapes that matter are text, lists and maps. [`PayloadValue`] captures exactly that.
//! Maps are `BTreeMap`s, which keeps keys sorted lexicographically (by code point) at every level of nesting without
//! a separate sorting pass.
use std::collections::BTreeMap;

use serde_json::Value;

pub type PayloadMap = BTreeMap<String, PayloadValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    Text(String),
    List(Vec<PayloadValue>),
    Map(PayloadMap),
}

impl PayloadValue {
    /// Converts arbitrary JSON into a payload tree, stringifying every leaf.
    ///
    /// * `null` becomes the empty string.
    /// * Booleans become `"True"` and `"False"`.
    /// * Numbers keep their JSON text representation.
    pub fn stringify_deep(value: &Value) -> Self {
        match value {
            Value::Null => Self::Text(String::new()),
            Value::Bool(true) => Self::Text("True".into()),
            Value::Bool(false) => Self::Text("False".into()),
            Value::Number(n) => Self::Text(n.to_string()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::stringify_deep).collect()),
            Value::Object(map) => Self::Map(map.iter().map(|(k, v)| (k.clone(), Self::stringify_deep(v))).collect()),
        }
    }

    /// Replaces every `\r\n` and lone `\r` in text leaves with `\n`.
    pub fn normalize_newlines_deep(&self) -> Self {
        match self {
            Self::Text(s) => Self::Text(normalize_newlines(s)),
            Self::List(items) => Self::List(items.iter().map(Self::normalize_newlines_deep).collect()),
            Self::Map(map) => Self::Map(normalize_map_newlines(map)),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Text(_))
    }

    /// Converts the tree back into plain JSON, e.g. for storing a snapshot of the payload.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

pub fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn normalize_map_newlines(map: &PayloadMap) -> PayloadMap {
    map.iter().map(|(k, v)| (k.clone(), v.normalize_newlines_deep())).collect()
}
