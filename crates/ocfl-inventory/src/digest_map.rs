use std::collections::{btree_map, BTreeMap, BTreeSet};

use ocfl_types::Digest;
use serde::{Deserialize, Serialize};

/// Digest to paths table, the shape of manifest, state and fixity blocks.
///
/// Keys and path sets are ordered, so serialization is canonical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestMap(BTreeMap<Digest, BTreeSet<String>>);

impl DigestMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.0.contains_key(digest)
    }

    pub fn get(&self, digest: &Digest) -> Option<&BTreeSet<String>> {
        self.0.get(digest)
    }

    /// Add `path` under `digest`. Returns `false` if it was already there.
    pub fn insert(&mut self, digest: Digest, path: impl Into<String>) -> bool {
        self.0.entry(digest).or_default().insert(path.into())
    }

    /// Remove `path` wherever it appears, dropping digests left without paths.
    pub fn remove_path(&mut self, path: &str) -> Option<Digest> {
        let digest = self.digest_for(path)?.clone();
        if let Some(paths) = self.0.get_mut(&digest) {
            paths.remove(path);
            if paths.is_empty() {
                self.0.remove(&digest);
            }
        }
        Some(digest)
    }

    /// Remove `path` from `digest`, dropping the digest if it has no paths
    /// left. Returns `false` if the pair was not present.
    pub fn remove_entry(&mut self, digest: &Digest, path: &str) -> bool {
        let Some(paths) = self.0.get_mut(digest) else {
            return false;
        };
        let removed = paths.remove(path);
        if paths.is_empty() {
            self.0.remove(digest);
        }
        removed
    }

    /// Digest stored under `path`, if any. Scans every digest; callers that
    /// look up many paths should build [`paths`](Self::paths) once.
    pub fn digest_for(&self, path: &str) -> Option<&Digest> {
        self.0
            .iter()
            .find(|(_, paths)| paths.contains(path))
            .map(|(digest, _)| digest)
    }

    pub fn digests(&self) -> impl Iterator<Item = &Digest> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Digest, BTreeSet<String>> {
        self.0.iter()
    }

    /// Every `(path, digest)` pair, sorted by path.
    pub fn paths(&self) -> BTreeMap<&str, &Digest> {
        self.0
            .iter()
            .flat_map(|(digest, paths)| paths.iter().map(move |p| (p.as_str(), digest)))
            .collect()
    }

    /// Number of paths across all digests.
    pub fn path_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// Merge every entry of `other` into `self`.
    pub fn extend(&mut self, other: &DigestMap) {
        for (digest, paths) in other.iter() {
            let entry = self.0.entry(digest.clone()).or_default();
            entry.extend(paths.iter().cloned());
        }
    }
}

impl<'a> IntoIterator for &'a DigestMap {
    type Item = (&'a Digest, &'a BTreeSet<String>);
    type IntoIter = btree_map::Iter<'a, Digest, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
