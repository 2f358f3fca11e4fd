//! Result records produced by the source adapters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Paths a single output field resolved to.
///
/// One match collapses to `Single`; zero or several stay a `Many` list. Serialises
/// untagged, so JSON consumers see either a string or an array.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum ResolvedPaths {
    Single(PathBuf),
    Many(Vec<PathBuf>),
}

impl ResolvedPaths {
    pub fn from_matches(mut matches: Vec<PathBuf>) -> Self {
        if matches.len() == 1 {
            if let Some(only) = matches.pop() {
                return ResolvedPaths::Single(only);
            }
        }
        ResolvedPaths::Many(matches)
    }

    /// All paths, in match order.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            ResolvedPaths::Single(path) => vec![path.as_path()],
            ResolvedPaths::Many(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResolvedPaths::Single(_) => 1,
            ResolvedPaths::Many(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolved files per semantic key; `None` marks a key with no files on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ResolvedOutputSet {
    entries: BTreeMap<String, Option<ResolvedPaths>>,
}

impl ResolvedOutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<ResolvedPaths>) {
        self.entries.insert(key.into(), value);
    }

    /// `None` if the key was never resolved; `Some(None)` if it resolved to nothing.
    pub fn get(&self, key: &str) -> Option<Option<&ResolvedPaths>> {
        self.entries.get(key).map(Option::as_ref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ResolvedPaths>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
