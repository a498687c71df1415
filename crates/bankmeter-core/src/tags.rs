//! Tags and meter identity.
//!
//! A meter is identified by its name plus a set of key/value tags. Tag sets
//! are kept in a `BTreeMap` so keys stay unique and iteration order is
//! deterministic (which also makes `MeterId` usable as a map key).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Key reserved for histogram bucket boundaries in the exposition format.
const RESERVED_BUCKET_KEY: &str = "le";

/// Set of tags with unique keys, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Tags {
    inner: BTreeMap<String, String>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tag set from `(key, value)` pairs. Later pairs win on duplicate keys.
    pub fn of<K, V, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = Self::new();
        for (k, v) in pairs {
            tags.insert(k, v)?;
        }
        Ok(tags)
    }

    /// Pairs known to be valid at compile time (crate-internal constants only).
    pub(crate) fn trusted(pairs: &[(&str, &str)]) -> Self {
        Self {
            inner: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Insert or replace a tag. Returns the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>> {
        let key = key.into();
        validate_key(&key)?;
        Ok(self.inner.insert(key, value.into()))
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Merge `other` into a copy of `self`; `other` wins on key collisions.
    pub fn and(&self, other: &Tags) -> Tags {
        let mut merged = self.clone();
        for (k, v) in &other.inner {
            merged.inner.insert(k.clone(), v.clone());
        }
        merged
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for Tags {
    type Error = MetricsError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        for key in map.keys() {
            validate_key(key)?;
        }
        Ok(Self { inner: map })
    }
}

impl From<Tags> for BTreeMap<String, String> {
    fn from(tags: Tags) -> Self {
        tags.inner
    }
}

/// Tag keys are exported as label names verbatim: `[a-zA-Z_][a-zA-Z0-9_]*`.
fn validate_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return Err(MetricsError::InvalidTag("tag key must not be empty".into()));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(MetricsError::InvalidTag(format!(
            "tag key must start with a letter or '_': {key}"
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MetricsError::InvalidTag(format!("tag key has invalid characters: {key}")));
    }
    if key == RESERVED_BUCKET_KEY {
        return Err(MetricsError::InvalidTag(format!("tag key is reserved: {key}")));
    }
    Ok(())
}

/// Meter identity: name plus full tag set (common tags included).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeterId {
    name: String,
    tags: Tags,
}

impl MeterId {
    pub fn new(name: impl Into<String>, tags: Tags) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, tags })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.tags.is_empty() {
            let joined = self
                .tags
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "{{{joined}}}")?;
        }
        Ok(())
    }
}

/// Dotted meter names, e.g. `bank.transfer`.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(MetricsError::InvalidName("meter name must not be empty".into()));
    };
    if !first.is_ascii_alphabetic() {
        return Err(MetricsError::InvalidName(format!(
            "meter name must start with a letter: {name}"
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(MetricsError::InvalidName(format!("meter name has invalid characters: {name}")));
    }
    Ok(())
}
