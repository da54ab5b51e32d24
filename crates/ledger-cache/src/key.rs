//! Query identities and invalidation patterns.

use std::collections::BTreeMap;
use std::fmt;

/// Identifies one cached query: a logical name plus the filter parameters
/// that produced it.
///
/// Parameters are ordered, so two keys built from the same filters in any
/// insertion order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl QueryKey {
    /// A key with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a filter parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Build a key from query-string style pairs.
    pub fn with_params<I, K, V>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Whether this key carries any filter parameters.
    pub fn is_filtered(&self) -> bool {
        !self.params.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "{{")?;
            for (i, (k, v)) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// Matches every cached key that shares a logical name, regardless of its
/// filter parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPattern {
    name: String,
}

impl QueryPattern {
    /// Match all keys with the given logical name.
    pub fn name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Whether a key matches this pattern.
    pub fn matches(&self, key: &QueryKey) -> bool {
        key.name == self.name
    }
}

impl fmt::Display for QueryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/*", self.name)
    }
}
