//! Bracket-notation form keys.
//!
//! HTML-form style payloads encode structure in their keys: `products[0][name]=Cake` means "the `name` field of the
//! first element of the `products` list". [`unflatten`] rebuilds the nested tree from such keys and [`flatten`] goes
//! the other way for outbound form posts.
//!
//! Whether a container is a list or a map is inferred from the segment that indexes into it: an all-digit segment
//! means a list index, anything else a map key. Gaps in list indices are padded with empty maps.
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::payload_value::{PayloadMap, PayloadValue};

/// Upper bound on list indices accepted from the wire. Keys like `a[99999999]` would otherwise make us allocate
/// enormous padded lists.
pub const MAX_LIST_INDEX: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketKeyError {
    #[error("Expected a list index in key {key}, got '{segment}'")]
    ExpectedIndex { key: String, segment: String },
    #[error("List index {index} in key {key} is too large")]
    IndexTooLarge { key: String, index: String },
    #[error("Key {0} nests inside a field that already holds a plain value")]
    ShapeConflict(String),
}

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^\[]+)((?:\[[^\]]*\])+)").expect("static regex is valid"))
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]").expect("static regex is valid"))
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn empty_container(next_segment: &str) -> PayloadValue {
    if is_index(next_segment) {
        PayloadValue::List(Vec::new())
    } else {
        PayloadValue::Map(PayloadMap::new())
    }
}

/// Splits `base[a][b]` into `("base", ["a", "b"])`. Keys without brackets (or starting with one) return `None`.
/// Anything trailing the last closing bracket is ignored.
pub fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let caps = key_regex().captures(key)?;
    let base = caps.get(1)?.as_str();
    let brackets = caps.get(2)?.as_str();
    let segments = segment_regex()
        .captures_iter(brackets)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect::<Vec<_>>();
    Some((base, segments))
}

/// Rebuilds nested lists and maps from bracket-notation keys. Keys without brackets are copied over as-is.
pub fn unflatten(flat: &PayloadMap) -> Result<PayloadMap, BracketKeyError> {
    let mut root = PayloadMap::new();
    for (key, value) in flat {
        match split_key(key) {
            None => {
                root.insert(key.clone(), value.clone());
            },
            Some((base, segments)) => {
                let node = root.entry(base.to_string()).or_insert_with(|| empty_container(segments[0]));
                insert_path(node, &segments, value.clone(), key)?;
            },
        }
    }
    Ok(root)
}

fn insert_path(
    node: &mut PayloadValue,
    segments: &[&str],
    value: PayloadValue,
    key: &str,
) -> Result<(), BracketKeyError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };
    match node {
        PayloadValue::List(items) => {
            if !is_index(segment) {
                return Err(BracketKeyError::ExpectedIndex { key: key.to_string(), segment: segment.to_string() });
            }
            let index = segment
                .parse::<usize>()
                .ok()
                .filter(|i| *i <= MAX_LIST_INDEX)
                .ok_or_else(|| BracketKeyError::IndexTooLarge { key: key.to_string(), index: segment.to_string() })?;
            while items.len() <= index {
                items.push(PayloadValue::Map(PayloadMap::new()));
            }
            let slot = &mut items[index];
            if rest.is_empty() {
                *slot = value;
                return Ok(());
            }
            if !slot.is_container() {
                *slot = PayloadValue::Map(PayloadMap::new());
            }
            insert_path(slot, rest, value, key)
        },
        PayloadValue::Map(map) => {
            if rest.is_empty() {
                map.insert(segment.to_string(), value);
                return Ok(());
            }
            let child = map.entry(segment.to_string()).or_insert_with(|| empty_container(rest[0]));
            if !child.is_container() {
                *child = empty_container(rest[0]);
            }
            insert_path(child, rest, value, key)
        },
        PayloadValue::Text(_) => Err(BracketKeyError::ShapeConflict(key.to_string())),
    }
}

/// Flattens a nested payload into bracket-notation form fields, e.g. `products[0][name]`.
pub fn flatten(map: &PayloadMap) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in map {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into(prefix: String, value: &PayloadValue, out: &mut Vec<(String, String)>) {
    match value {
        PayloadValue::Text(s) => out.push((prefix, s.clone())),
        PayloadValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{i}]"), item, out);
            }
        },
        PayloadValue::Map(map) => {
            for (k, v) in map {
                flatten_into(format!("{prefix}[{k}]"), v, out);
            }
        },
    }
}
