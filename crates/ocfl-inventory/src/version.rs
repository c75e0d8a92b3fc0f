use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use ocfl_types::{Digest, DigestAlgorithm, User, VersionLabel};
use serde::{Deserialize, Serialize};

use crate::digest_map::DigestMap;

/// A committed, immutable version block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub state: DigestMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// The version being built by an open update.
///
/// Lives beside the committed versions and is only promoted into them by a
/// successful commit. Readers of [`Inventory::versions`] never observe it.
///
/// State and new content are kept twice: as digest maps for serialization
/// and as path indexes, so per-file lookups stay logarithmic.
///
/// [`Inventory::versions`]: crate::Inventory::versions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftVersion {
    pub(crate) label: VersionLabel,
    pub(crate) created: DateTime<Utc>,
    pub(crate) message: Option<String>,
    pub(crate) user: Option<User>,
    state: DigestMap,
    state_index: BTreeMap<String, Digest>,
    /// State of the previous head, or empty for the first version.
    base_state: DigestMap,
    /// Manifest entries added by this version.
    new_content: DigestMap,
    content_index: BTreeMap<String, Digest>,
    pub(crate) new_fixity: BTreeMap<DigestAlgorithm, DigestMap>,
    pub(crate) echo: bool,
}

impl DraftVersion {
    pub(crate) fn new(
        label: VersionLabel,
        message: Option<String>,
        user: Option<User>,
        base_state: DigestMap,
        echo: bool,
    ) -> Self {
        let state_index = base_state
            .paths()
            .into_iter()
            .map(|(path, digest)| (path.to_string(), digest.clone()))
            .collect();
        Self {
            label,
            created: Utc::now().trunc_subsecs(0),
            message,
            user,
            state: base_state.clone(),
            state_index,
            base_state,
            new_content: DigestMap::new(),
            content_index: BTreeMap::new(),
            new_fixity: BTreeMap::new(),
            echo,
        }
    }

    pub(crate) fn state_digest(&self, path: &str) -> Option<&Digest> {
        self.state_index.get(path)
    }

    /// Put `path` under `digest`, returning the digest it held before.
    pub(crate) fn insert_state(&mut self, digest: Digest, path: &str) -> Option<Digest> {
        let previous = self.remove_state(path);
        self.state.insert(digest.clone(), path);
        self.state_index.insert(path.to_string(), digest);
        previous
    }

    pub(crate) fn remove_state(&mut self, path: &str) -> Option<Digest> {
        let digest = self.state_index.remove(path)?;
        self.state.remove_entry(&digest, path);
        Some(digest)
    }

    /// A state path that `path` would nest inside, or that nests inside it.
    pub(crate) fn state_conflict(&self, path: &str) -> Option<&str> {
        nesting_conflict(&self.state_index, path)
    }

    pub(crate) fn insert_content(&mut self, digest: Digest, path: &str) {
        self.new_content.insert(digest.clone(), path);
        self.content_index.insert(path.to_string(), digest);
    }

    /// Forget a content path written by this version, with its fixity.
    pub(crate) fn remove_content(&mut self, path: &str) -> Option<Digest> {
        let digest = self.content_index.remove(path)?;
        self.new_content.remove_entry(&digest, path);
        for map in self.new_fixity.values_mut() {
            map.remove_path(path);
        }
        self.new_fixity.retain(|_, map| !map.is_empty());
        Some(digest)
    }

    /// Whether `path` is free to receive new content: not used by this
    /// version, and neither inside nor around a used path.
    pub(crate) fn content_path_free(&self, path: &str) -> bool {
        !self.content_index.contains_key(path)
            && nesting_conflict(&self.content_index, path).is_none()
    }

    pub fn label(&self) -> VersionLabel {
        self.label
    }

    pub fn state(&self) -> &DigestMap {
        &self.state
    }

    pub fn base_state(&self) -> &DigestMap {
        &self.base_state
    }

    pub fn new_content(&self) -> &DigestMap {
        &self.new_content
    }

    pub fn is_echo(&self) -> bool {
        self.echo
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether committing would record anything beyond the previous head.
    pub fn is_changed(&self) -> bool {
        !self.echo && (!self.new_content.is_empty() || self.state != self.base_state)
    }

    /// The state the committed version will carry.
    pub fn final_state(&self) -> &DigestMap {
        if self.echo {
            &self.base_state
        } else {
            &self.state
        }
    }

    pub(crate) fn into_version(self) -> Version {
        let state = if self.echo { self.base_state } else { self.state };
        Version {
            created: self.created,
            message: self.message,
            state,
            user: self.user,
        }
    }
}

/// An entry of `index` that `path` would sit inside, or that would sit
/// inside `path`.
pub(crate) fn nesting_conflict<'a, V>(index: &'a BTreeMap<String, V>, path: &str) -> Option<&'a str> {
    for (i, _) in path.match_indices('/') {
        if let Some((existing, _)) = index.get_key_value(&path[..i]) {
            return Some(existing);
        }
    }
    let as_dir = format!("{path}/");
    index
        .range(as_dir.clone()..)
        .next()
        .map(|(existing, _)| existing.as_str())
        .filter(|existing| existing.starts_with(&as_dir))
}
