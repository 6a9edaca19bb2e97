use crate::domain::ParamValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct GridKey(Vec<ParamValue>);

impl PartialEq for GridKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GridKey {}

impl PartialOrd for GridKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(left, right)| left.total_cmp(right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

/// Exact map from a full parameter tuple to a run-relative path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridIndex {
    entries: BTreeMap<GridKey, PathBuf>,
}

/// Serialized form of one index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub values: Vec<ParamValue>,
    pub path: PathBuf,
}

impl GridIndex {
    /// Returns the previously stored path when `values` was already present.
    pub fn insert(&mut self, values: Vec<ParamValue>, path: PathBuf) -> Option<PathBuf> {
        self.entries.insert(GridKey(values), path)
    }

    pub fn get(&self, values: &[ParamValue]) -> Option<&Path> {
        self.entries
            .get(&GridKey(values.to_vec()))
            .map(PathBuf::as_path)
    }

    pub fn contains(&self, values: &[ParamValue]) -> bool {
        self.get(values).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[ParamValue], &Path)> {
        self.entries
            .iter()
            .map(|(key, path)| (key.0.as_slice(), path.as_path()))
    }

    pub fn to_entries(&self) -> Vec<IndexEntry> {
        self.iter()
            .map(|(values, path)| IndexEntry {
                values: values.to_vec(),
                path: path.to_path_buf(),
            })
            .collect()
    }
}

impl FromIterator<IndexEntry> for GridIndex {
    fn from_iter<I: IntoIterator<Item = IndexEntry>>(iter: I) -> Self {
        let mut index = Self::default();
        for entry in iter {
            index.insert(entry.values, entry.path);
        }
        index
    }
}
