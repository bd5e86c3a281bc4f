//! In-memory YAML document addressed by dotted keys.
//!
//! `players.steve.last-seen` names the `last-seen` leaf inside the nested
//! mappings `players` -> `steve`. Anything in the document that the store
//! never touches is carried through a rewrite untouched, so the file stays
//! hand-editable. Segments match scalar keys by their text, so a hand-written
//! `1234:` or `null:` key is found as `1234` or `null`.

use serde_yaml::{Mapping, Number, Value};

use crate::error::{DbError, Result};

/// Full contents of one store file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Mapping,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file contents. Empty or `null` input is an empty document.
    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }

        match serde_yaml::from_str::<Value>(contents)? {
            Value::Null => Ok(Self::new()),
            Value::Mapping(root) => Ok(Self { root }),
            _ => Err(DbError::NotAMapping),
        }
    }

    /// Serialize the whole document back to YAML text.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Look up the raw value at a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let segments = split_key(key).ok()?;
        let (leaf, parents) = segments.split_last()?;

        let mut node = &self.root;
        for segment in parents {
            node = lookup(node, segment)?.as_mapping()?;
        }
        lookup(node, leaf)
    }

    /// Integer at a dotted key. Non-integer leaves read as absent.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Store an integer at a dotted key, creating intermediate mappings.
    /// A scalar sitting where a mapping is needed gets replaced.
    pub fn set_i64(&mut self, key: &str, value: i64) -> Result<()> {
        let segments = split_key(key)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(DbError::InvalidKey(key.to_string()));
        };

        let mut node = &mut self.root;
        for segment in parents {
            let child_key = existing_key(node, segment);
            let child = node
                .entry(child_key)
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !child.is_mapping() {
                *child = Value::Mapping(Mapping::new());
            }
            node = child.as_mapping_mut().ok_or(DbError::NotAMapping)?;
        }

        let leaf_key = existing_key(node, leaf);
        node.insert(leaf_key, Value::Number(Number::from(value)));
        Ok(())
    }

    /// Number of non-mapping leaves, for load diagnostics.
    pub fn leaf_count(&self) -> usize {
        fn count(mapping: &Mapping) -> usize {
            mapping
                .values()
                .map(|v| match v {
                    Value::Mapping(m) => count(m),
                    _ => 1,
                })
                .sum()
        }
        count(&self.root)
    }
}

/// Child of `mapping` whose key reads as `segment`.
fn lookup<'a>(mapping: &'a Mapping, segment: &str) -> Option<&'a Value> {
    mapping.get(segment).or_else(|| {
        mapping
            .iter()
            .find(|(key, _)| key_matches(key, segment))
            .map(|(_, value)| value)
    })
}

/// The key already used for `segment` in `mapping`, or a new string key.
fn existing_key(mapping: &Mapping, segment: &str) -> Value {
    if mapping.contains_key(segment) {
        return Value::String(segment.to_string());
    }
    mapping
        .keys()
        .find(|key| key_matches(key, segment))
        .cloned()
        .unwrap_or_else(|| Value::String(segment.to_string()))
}

fn key_matches(key: &Value, segment: &str) -> bool {
    match key {
        Value::String(s) => s == segment,
        Value::Number(n) => n.to_string() == segment,
        Value::Bool(b) => b.to_string() == segment,
        Value::Null => segment == "null" || segment == "~",
        _ => false,
    }
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DbError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}
