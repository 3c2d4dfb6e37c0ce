/*
 * keys.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Key definitions and the lookup seam used by key reference resolution.
 */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Scope of a reference or key target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Part of the document set; rewritten.
    #[default]
    Local,
    /// Part of another document set; left as written.
    Peer,
    /// Outside any document set; left as written.
    External,
}

impl Scope {
    /// Parse a `scope` attribute value. Missing or unknown values mean local.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("peer") => Scope::Peer,
            Some("external") => Scope::External,
            _ => Scope::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Peer => "peer",
            Scope::External => "external",
        }
    }
}

/// A named key and what it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KeyDefinition {
    pub key: String,

    /// Target as written in the defining map. `None` for keys that only
    /// carry text.
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub scope: Scope,

    /// Path of the defining map, relative to the source root.
    pub source: String,
}

impl KeyDefinition {
    pub fn new(key: impl Into<String>, target: Option<&str>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: target.map(str::to_string),
            scope: Scope::Local,
            source: source.into(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Read-only key lookup shared by all document rewrites.
pub trait KeyLookup: Send + Sync {
    fn lookup(&self, key: &str) -> Option<&KeyDefinition>;
}

/// Key definitions indexed by name.
///
/// The first definition of a key wins, matching map order precedence.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    keys: HashMap<String, KeyDefinition>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition unless the key is already defined.
    pub fn insert(&mut self, definition: KeyDefinition) -> bool {
        if self.keys.contains_key(&definition.key) {
            return false;
        }
        self.keys.insert(definition.key.clone(), definition);
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Load definitions from a YAML sequence.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let definitions: Vec<KeyDefinition> = serde_yaml::from_str(yaml)?;
        Ok(definitions.into_iter().collect())
    }
}

impl FromIterator<KeyDefinition> for KeyTable {
    fn from_iter<I: IntoIterator<Item = KeyDefinition>>(iter: I) -> Self {
        let mut table = KeyTable::new();
        for definition in iter {
            table.insert(definition);
        }
        table
    }
}

impl KeyLookup for KeyTable {
    fn lookup(&self, key: &str) -> Option<&KeyDefinition> {
        self.keys.get(key)
    }
}

impl<S: std::hash::BuildHasher + Send + Sync> KeyLookup for HashMap<String, KeyDefinition, S> {
    fn lookup(&self, key: &str) -> Option<&KeyDefinition> {
        self.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_definition_wins() {
        let table: KeyTable = [
            KeyDefinition::new("k", Some("a.dita"), "main.ditamap"),
            KeyDefinition::new("k", Some("b.dita"), "other.ditamap"),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("k").and_then(|d| d.target.as_deref()),
            Some("a.dita")
        );
        assert!(table.lookup("missing").is_none());
    }

    #[test]
    fn test_scope_from_attribute() {
        assert_eq!(Scope::from_attribute(None), Scope::Local);
        assert_eq!(Scope::from_attribute(Some("external")), Scope::External);
        assert_eq!(Scope::from_attribute(Some("peer")), Scope::Peer);
        assert_eq!(Scope::from_attribute(Some("bogus")), Scope::Local);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
- key: keyword
  target: keyword.dita#keyword
  source: main.ditamap
- key: site
  target: https://example.com
  scope: external
  source: main.ditamap
- key: product
  source: main.ditamap
"#;
        let table = KeyTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("site").map(|d| d.scope), Some(Scope::External));
        assert_eq!(table.lookup("product").and_then(|d| d.target.clone()), None);
    }

    #[test]
    fn test_hash_map_is_a_lookup() {
        let mut map = HashMap::new();
        map.insert(
            "k".to_string(),
            KeyDefinition::new("k", Some("a.dita"), "main.ditamap"),
        );
        let lookup: &dyn KeyLookup = &map;
        assert!(lookup.lookup("k").is_some());
    }
}
