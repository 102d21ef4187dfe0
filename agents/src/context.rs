use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

pub const LAST_OUTPUT: &str = "last_output";
pub const LAST_AGENT: &str = "last_agent";
pub const WORKING_DIR: &str = "working_dir";

/// A single context entry. Everything renders to a string for template substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    String(String),
    Number(f64),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ContextValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            ContextValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::String(value) => f.write_str(value),
            ContextValue::Number(value) => write!(f, "{value}"),
            ContextValue::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Number(value as f64)
    }
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
    fn from(map: BTreeMap<String, ContextValue>) -> Self {
        ContextValue::Map(map)
    }
}

impl From<BTreeMap<String, String>> for ContextValue {
    fn from(map: BTreeMap<String, String>) -> Self {
        ContextValue::Map(
            map.into_iter()
                .map(|(key, value)| (key, ContextValue::String(value)))
                .collect(),
        )
    }
}

/// Run-scoped key/value state threaded between workflow steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    entries: BTreeMap<String, ContextValue>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ContextValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Option<ContextValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.entries.remove(key)
    }

    /// Overwrite per key with every entry of `other`.
    pub fn merge(&mut self, other: &ExecutionContext) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Entries of `self` that are absent from `base` or hold a different value there.
    pub fn changes_from(&self, base: &ExecutionContext) -> ExecutionContext {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(key, value)| base.entries.get(key.as_str()) != Some(*value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Copy of `self` with `overrides` applied on top.
    pub fn overlaid(&self, overrides: &ExecutionContext) -> ExecutionContext {
        let mut merged = self.clone();
        merged.merge(overrides);
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.entries.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for ExecutionContext
where
    K: Into<String>,
    V: Into<ContextValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for ExecutionContext
where
    K: Into<String>,
    V: Into<ContextValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_render_naturally() {
        assert_eq!(ContextValue::from(3.0).to_string(), "3");
        assert_eq!(ContextValue::from(0.25).to_string(), "0.25");
        assert_eq!(ContextValue::from(42_i64).to_string(), "42");
    }

    #[test]
    fn maps_render_in_key_order() {
        let mut nested = BTreeMap::new();
        nested.insert("b".to_string(), ContextValue::from("two"));
        nested.insert("a".to_string(), ContextValue::from(1.0));
        assert_eq!(ContextValue::from(nested).to_string(), "{a: 1, b: two}");
    }

    #[test]
    fn overlay_prefers_overrides() {
        let base: ExecutionContext = [("lang", "rust"), ("mode", "draft")].into_iter().collect();
        let overrides: ExecutionContext = [("mode", "final")].into_iter().collect();
        let merged = base.overlaid(&overrides);
        assert_eq!(merged.get_str("lang"), Some("rust"));
        assert_eq!(merged.get_str("mode"), Some("final"));
        assert_eq!(base.get_str("mode"), Some("draft"));
    }

    #[test]
    fn changes_keep_new_and_modified_entries_only() {
        let base: ExecutionContext = [("env", "staging"), ("lang", "rust")].into_iter().collect();
        let mut after = base.clone();
        after.insert("lang", "go");
        after.insert("working_dir", "/src");

        let changes = after.changes_from(&base);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get_str("lang"), Some("go"));
        assert_eq!(changes.get_str("working_dir"), Some("/src"));
        assert!(!changes.contains_key("env"));
    }

    #[test]
    fn deserializes_mixed_values() {
        let context: ExecutionContext =
            serde_json::from_str(r#"{"name": "demo", "count": 2, "meta": {"owner": "ops"}}"#)
                .unwrap();
        assert_eq!(context.get_str("name"), Some("demo"));
        assert_eq!(context.get("count").and_then(ContextValue::as_f64), Some(2.0));
        assert_eq!(
            context
                .get("meta")
                .and_then(ContextValue::as_map)
                .and_then(|meta| meta.get("owner"))
                .and_then(ContextValue::as_str),
            Some("ops")
        );
    }
}
