use std::collections::BTreeMap;

use ocfl_fs::WriteFs;
use ocfl_types::{Digest, DigestAlgorithm, OcflVersion, User, VersionLabel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::digest_map::DigestMap;
use crate::error::{InventoryError, InventoryResult};
use crate::io;
use crate::validation::{self, Finding};
use crate::version::{DraftVersion, Version};

/// Name of the content directory when the inventory does not set one.
pub const DEFAULT_CONTENT_DIRECTORY: &str = "content";

/// Outcome of registering a logical path in the open version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The path already held this digest, or the version is an echo.
    Unchanged,
    /// The path was new.
    Added,
    /// The path held another digest and was overwritten.
    Replaced,
}

/// Result of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    pub label: VersionLabel,
    /// Digests added to the manifest by this version.
    pub new_digests: usize,
    /// Whether the committed state differs from the previous head.
    pub state_changed: bool,
    /// Content paths written during the update but no longer referenced by
    /// the final state. They were left out of the manifest.
    pub orphaned: Vec<String>,
}

impl CommitSummary {
    pub fn is_modified(&self) -> bool {
        self.new_digests > 0 || self.state_changed
    }
}

/// The complete OCFL inventory of one object.
///
/// Fields are declared in lexical order of their JSON names and every map is
/// ordered, so [`to_canonical_json`](Self::to_canonical_json) always yields
/// the same bytes for the same inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_directory: Option<String>,
    digest_algorithm: DigestAlgorithm,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    fixity: BTreeMap<DigestAlgorithm, DigestMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    head: Option<VersionLabel>,
    id: String,
    manifest: DigestMap,
    #[serde(rename = "type")]
    inventory_type: String,
    versions: BTreeMap<VersionLabel, Version>,

    #[serde(skip)]
    draft: Option<DraftVersion>,
    #[serde(skip)]
    padding: usize,
}

impl Inventory {
    /// Empty inventory for a brand-new object.
    pub fn new(
        id: impl Into<String>,
        digest_algorithm: DigestAlgorithm,
        ocfl_version: OcflVersion,
    ) -> InventoryResult<Self> {
        if !digest_algorithm.is_content_algorithm() {
            return Err(InventoryError::InvalidAlgorithm(digest_algorithm));
        }
        Ok(Self {
            content_directory: None,
            digest_algorithm,
            fixity: BTreeMap::new(),
            head: None,
            id: id.into(),
            manifest: DigestMap::new(),
            inventory_type: ocfl_version.inventory_type(),
            versions: BTreeMap::new(),
            draft: None,
            padding: 0,
        })
    }

    /// Parse an inventory from its JSON form.
    ///
    /// Labels without leading zeros (`v10`) do not show the padding width on
    /// their own, so the width of the first version is applied to the whole
    /// sequence when every label fits it.
    pub fn from_json(data: &[u8]) -> InventoryResult<Self> {
        let mut inventory: Self = serde_json::from_slice(data)?;
        inventory.restore_label_width();
        Ok(inventory)
    }

    fn restore_label_width(&mut self) {
        let Some(width) = self.versions.keys().next().map(VersionLabel::padding) else {
            return;
        };
        let fits = self.versions.keys().all(|label| label.fits_width(width))
            && self.head.map_or(true, |head| head.fits_width(width));
        if !fits {
            return;
        }
        self.versions = std::mem::take(&mut self.versions)
            .into_iter()
            .map(|(label, version)| (label.with_padding(width), version))
            .collect();
        self.head = self.head.map(|head| head.with_padding(width));
        self.padding = width;
    }

    /// Deterministic pretty-printed JSON.
    pub fn to_canonical_json(&self) -> InventoryResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn inventory_type(&self) -> &str {
        &self.inventory_type
    }

    pub fn ocfl_version(&self) -> InventoryResult<OcflVersion> {
        Ok(OcflVersion::from_inventory_type(&self.inventory_type)?)
    }

    pub fn head(&self) -> Option<VersionLabel> {
        self.head
    }

    pub fn manifest(&self) -> &DigestMap {
        &self.manifest
    }

    pub fn fixity(&self) -> &BTreeMap<DigestAlgorithm, DigestMap> {
        &self.fixity
    }

    /// Committed versions only; the open draft is never included.
    pub fn versions(&self) -> &BTreeMap<VersionLabel, Version> {
        &self.versions
    }

    pub fn version(&self, label: VersionLabel) -> Option<&Version> {
        self.versions.get(&label)
    }

    pub fn head_version(&self) -> Option<&Version> {
        self.head.and_then(|label| self.versions.get(&label))
    }

    pub fn content_directory(&self) -> &str {
        self.content_directory
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_DIRECTORY)
    }

    /// Use a non-default content directory. Only allowed before the first
    /// version is committed.
    pub fn set_content_directory(&mut self, dir: &str) -> InventoryResult<()> {
        if !self.versions.is_empty() {
            return Err(InventoryError::Structure(
                "content directory is fixed once a version exists".into(),
            ));
        }
        if dir.is_empty() || dir.contains('/') || dir == "." || dir == ".." {
            return Err(InventoryError::InvalidPath(dir.to_string()));
        }
        self.content_directory = (dir != DEFAULT_CONTENT_DIRECTORY).then(|| dir.to_string());
        Ok(())
    }

    /// Zero-pad version labels to `width` digits. Only allowed before the
    /// first version is committed; later versions follow the head's width.
    pub fn set_version_padding(&mut self, width: usize) -> InventoryResult<()> {
        if !self.versions.is_empty() {
            return Err(InventoryError::Structure(
                "version padding is fixed once a version exists".into(),
            ));
        }
        self.padding = width;
        Ok(())
    }

    /// Label the next version will get.
    pub fn next_label(&self) -> InventoryResult<VersionLabel> {
        match self.head {
            Some(head) => Ok(head.next()?),
            None => Ok(VersionLabel::first_padded(self.padding)),
        }
    }

    // -----------------------------------------------------------------------
    // Draft version
    // -----------------------------------------------------------------------

    /// Open the next version, starting from the previous head's state.
    ///
    /// With `echo` set, the committed state will equal the previous head's
    /// state whatever is added in between.
    pub fn begin_version(
        &mut self,
        message: Option<String>,
        user: Option<User>,
        echo: bool,
    ) -> InventoryResult<VersionLabel> {
        if let Some(draft) = &self.draft {
            return Err(InventoryError::VersionAlreadyOpen(draft.label));
        }
        let label = self.next_label()?;
        let base_state = self
            .head_version()
            .map(|v| v.state.clone())
            .unwrap_or_default();
        self.draft = Some(DraftVersion::new(label, message, user, base_state, echo));
        debug!(object_id = %self.id, version = %label, echo, "opened version");
        Ok(label)
    }

    pub fn draft(&self) -> Option<&DraftVersion> {
        self.draft.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    fn draft_mut(&mut self) -> InventoryResult<&mut DraftVersion> {
        self.draft.as_mut().ok_or(InventoryError::NoOpenVersion)
    }

    /// Fresh content path for bytes stored under `state_path` by the open
    /// version.
    ///
    /// Normally `vN/<content>/<state_path>`. When the open version already
    /// wrote that path, for example before the logical path was
    /// overwritten, or a path it would nest with, a numbered directory is
    /// put in front: `vN/<content>/2/<state_path>`. Stored content is never
    /// rewritten.
    pub fn new_content_path(&self, state_path: &str) -> InventoryResult<String> {
        let draft = self.draft.as_ref().ok_or(InventoryError::NoOpenVersion)?;
        let base = format!("{}/{}", draft.label, self.content_directory());
        let natural = format!("{base}/{state_path}");
        if draft.content_path_free(&natural) {
            return Ok(natural);
        }
        (2u64..)
            .map(|n| format!("{base}/{n}/{state_path}"))
            .find(|candidate| draft.content_path_free(candidate))
            .ok_or_else(|| InventoryError::InvalidPath(natural))
    }

    /// Whether `digest` is already stored, committed or by the open version.
    pub fn has_digest(&self, digest: &Digest) -> bool {
        self.manifest.contains(digest)
            || self
                .draft
                .as_ref()
                .is_some_and(|d| d.new_content().contains(digest))
    }

    /// Content paths holding `digest`, committed or pending.
    pub fn content_paths(&self, digest: &Digest) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .manifest
            .get(digest)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        if let Some(pending) = self.draft.as_ref().and_then(|d| d.new_content().get(digest)) {
            paths.extend(pending.iter().map(String::as_str));
        }
        paths
    }

    /// Digest stored under a state path in the open version.
    pub fn draft_digest(&self, state_path: &str) -> Option<&Digest> {
        self.draft.as_ref()?.state_digest(state_path)
    }

    /// Register `state_path` under `digest` in the open version.
    ///
    /// If the digest is new, `content_path` names where its bytes were
    /// written and becomes a manifest entry. If the digest is already stored
    /// the content path is ignored: the existing content is reused.
    pub fn add_digest(
        &mut self,
        digest: &Digest,
        state_path: &str,
        content_path: Option<&str>,
        overwrite: bool,
    ) -> InventoryResult<AddOutcome> {
        check_path(state_path)?;
        let known = self.has_digest(digest);
        let draft = self.draft_mut()?;
        if draft.echo {
            return Ok(AddOutcome::Unchanged);
        }

        let outcome = match draft.state_digest(state_path) {
            Some(existing) if existing == digest => return Ok(AddOutcome::Unchanged),
            Some(existing) if !overwrite => {
                return Err(InventoryError::PathConflict {
                    path: state_path.to_string(),
                    existing: existing.clone(),
                })
            }
            Some(_) => AddOutcome::Replaced,
            None => {
                if let Some(other) = draft.state_conflict(state_path) {
                    return Err(InventoryError::NestedPath {
                        path: state_path.to_string(),
                        other: other.to_string(),
                    });
                }
                AddOutcome::Added
            }
        };

        if !known {
            let content_path =
                content_path.ok_or_else(|| InventoryError::UnknownDigest(digest.clone()))?;
            check_path(content_path)?;
            draft.insert_content(digest.clone(), content_path);
        }
        draft.insert_state(digest.clone(), state_path);
        Ok(outcome)
    }

    /// Record an additional physical copy of an already stored digest.
    ///
    /// Used when content is written without checking for duplicates; the
    /// copy becomes a second manifest path of the same digest. Ignored in
    /// echo versions.
    pub fn add_content_copy(&mut self, digest: &Digest, content_path: &str) -> InventoryResult<()> {
        check_path(content_path)?;
        if !self.has_digest(digest) {
            return Err(InventoryError::UnknownDigest(digest.clone()));
        }
        let draft = self.draft_mut()?;
        if !draft.echo {
            draft.insert_content(digest.clone(), content_path);
        }
        Ok(())
    }

    /// Take back a content path registered by the open version, together
    /// with its fixity. Returns the digest it was stored under.
    pub fn remove_content_path(&mut self, content_path: &str) -> InventoryResult<Option<Digest>> {
        Ok(self.draft_mut()?.remove_content(content_path))
    }

    /// Record a fixity digest for content written by the open version.
    pub fn add_fixity(
        &mut self,
        algorithm: DigestAlgorithm,
        digest: &Digest,
        content_path: &str,
    ) -> InventoryResult<()> {
        if algorithm == self.digest_algorithm {
            return Ok(());
        }
        let draft = self.draft_mut()?;
        draft
            .new_fixity
            .entry(algorithm)
            .or_default()
            .insert(digest.clone(), content_path);
        Ok(())
    }

    /// Remove a logical path from the open version's state.
    pub fn remove_path(&mut self, state_path: &str) -> InventoryResult<Option<Digest>> {
        let draft = self.draft_mut()?;
        if draft.echo {
            return Ok(None);
        }
        Ok(draft.remove_state(state_path))
    }

    /// Drop the open version, returning it so the caller can clean up
    /// content it already wrote.
    pub fn discard_version(&mut self) -> Option<DraftVersion> {
        let draft = self.draft.take();
        if let Some(d) = &draft {
            debug!(object_id = %self.id, version = %d.label, "discarded version");
        }
        draft
    }

    /// Promote the open version and write inventory plus sidecar.
    ///
    /// The new inventory is built and written before it replaces `self`, so
    /// a failed write leaves both the stored files and the in-memory
    /// committed state as they were, with the draft still open.
    pub fn commit(&mut self, fs: &dyn WriteFs) -> InventoryResult<CommitSummary> {
        let draft = self.draft.clone().ok_or(InventoryError::NoOpenVersion)?;
        let label = draft.label;
        let state_changed = draft.final_state() != draft.base_state();

        let mut next = self.clone();
        next.draft = None;

        let mut new_digests = 0;
        let mut orphaned = Vec::new();
        let final_state = draft.final_state();
        for (digest, paths) in draft.new_content().iter() {
            if final_state.contains(digest) {
                if !self.manifest.contains(digest) {
                    new_digests += 1;
                }
                for path in paths {
                    next.manifest.insert(digest.clone(), path.clone());
                }
            } else {
                orphaned.extend(paths.iter().cloned());
            }
        }
        for (alg, map) in &draft.new_fixity {
            for (digest, paths) in map {
                for path in paths.iter().filter(|p| !orphaned.contains(*p)) {
                    next.fixity
                        .entry(*alg)
                        .or_default()
                        .insert(digest.clone(), path.clone());
                }
            }
        }
        next.versions.insert(label, draft.into_version());
        next.head = Some(label);

        io::write_inventory(fs, &next, Some(label))?;
        *self = next;

        info!(
            object_id = %self.id,
            head = %label,
            new_digests,
            state_changed,
            "committed version"
        );
        Ok(CommitSummary {
            label,
            new_digests,
            state_changed,
            orphaned,
        })
    }

    /// Structural findings for this inventory.
    pub fn validate(&self) -> Vec<Finding> {
        validation::validate_inventory(self)
    }
}

/// Logical and content paths are relative, slash separated and free of
/// empty, `.` and `..` segments.
pub(crate) fn check_path(path: &str) -> InventoryResult<()> {
    let bad = path.is_empty()
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(InventoryError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ocfl_fs::{MemoryFs, ReadFs};

    use super::*;

    fn d(s: &str) -> Digest {
        Digest::from_hex(s).unwrap()
    }

    fn new_inventory() -> Inventory {
        Inventory::new("id:abc123", DigestAlgorithm::Sha512, OcflVersion::V1_1).unwrap()
    }

    fn jane() -> Option<User> {
        Some(User::new("Jane Doe", Some("mailto:jane@example.org".into())))
    }

    #[test]
    fn new_rejects_fixity_only_algorithm() {
        let err = Inventory::new("x", DigestAlgorithm::Md5, OcflVersion::V1_1).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidAlgorithm(DigestAlgorithm::Md5)));
    }

    #[test]
    fn only_one_open_version() {
        let mut inv = new_inventory();
        assert_eq!(inv.begin_version(None, None, false).unwrap().to_string(), "v1");
        assert!(matches!(
            inv.begin_version(None, None, false),
            Err(InventoryError::VersionAlreadyOpen(_))
        ));
    }

    #[test]
    fn add_without_open_version_fails() {
        let mut inv = new_inventory();
        assert!(matches!(
            inv.add_digest(&d("aa"), "a", Some("v1/content/a"), false),
            Err(InventoryError::NoOpenVersion)
        ));
    }

    #[test]
    fn commit_first_version() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(Some("initial add".into()), jane(), false).unwrap();
        for (digest, name) in [("aa", "a.txt"), ("bb", "b.txt"), ("cc", "c/d.txt")] {
            let content = inv.new_content_path(name).unwrap();
            assert_eq!(inv.add_digest(&d(digest), name, Some(&content), false).unwrap(), AddOutcome::Added);
        }
        let summary = inv.commit(&fs).unwrap();

        assert_eq!(summary.label.to_string(), "v1");
        assert_eq!(summary.new_digests, 3);
        assert!(summary.is_modified());
        assert_eq!(inv.head().unwrap().to_string(), "v1");
        assert_eq!(inv.manifest().len(), 3);
        assert_eq!(inv.version(summary.label).unwrap().state.len(), 3);
        assert!(!inv.is_open());
        assert!(fs.exists("inventory.json").unwrap());
        assert!(fs.exists("inventory.json.sha512").unwrap());
        assert!(fs.exists("v1/inventory.json").unwrap());
    }

    #[test]
    fn known_digest_reuses_content() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.commit(&fs).unwrap();

        inv.begin_version(None, None, false).unwrap();
        // content path ignored for known digests
        inv.add_digest(&d("aa"), "copy.txt", Some("v2/content/copy.txt"), false).unwrap();
        let summary = inv.commit(&fs).unwrap();

        assert_eq!(summary.new_digests, 0);
        assert!(summary.state_changed);
        assert_eq!(inv.manifest().len(), 1);
        assert_eq!(inv.manifest().get(&d("aa")).unwrap().len(), 1);
        assert_eq!(inv.head_version().unwrap().state.path_count(), 2);
    }

    #[test]
    fn content_copy_adds_second_manifest_path() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.commit(&fs).unwrap();

        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "b.txt", None, false).unwrap();
        inv.add_content_copy(&d("aa"), "v2/content/b.txt").unwrap();
        assert!(inv.add_content_copy(&d("bb"), "v2/content/c.txt").is_err());
        let summary = inv.commit(&fs).unwrap();

        assert_eq!(summary.new_digests, 0);
        assert_eq!(inv.manifest().len(), 1);
        assert_eq!(inv.content_paths(&d("aa")), ["v1/content/a.txt", "v2/content/b.txt"]);
    }

    #[test]
    fn unknown_digest_needs_content_path() {
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        assert!(matches!(
            inv.add_digest(&d("aa"), "a.txt", None, false),
            Err(InventoryError::UnknownDigest(_))
        ));
    }

    #[test]
    fn conflicting_path_without_overwrite() {
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        assert_eq!(
            inv.add_digest(&d("aa"), "a.txt", None, false).unwrap(),
            AddOutcome::Unchanged
        );
        assert!(matches!(
            inv.add_digest(&d("bb"), "a.txt", Some("v1/content/a.txt"), false),
            Err(InventoryError::PathConflict { .. })
        ));
        assert_eq!(
            inv.add_digest(&d("bb"), "a.txt", Some("v1/content/a.txt"), true).unwrap(),
            AddOutcome::Replaced
        );
        assert_eq!(inv.draft_digest("a.txt"), Some(&d("bb")));
    }

    #[test]
    fn nested_logical_paths_conflict() {
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a", Some("v1/content/a"), false).unwrap();
        assert!(matches!(
            inv.add_digest(&d("bb"), "a/b", Some("v1/content/a/b"), false),
            Err(InventoryError::NestedPath { .. })
        ));
    }

    #[test]
    fn invalid_paths_rejected() {
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        for bad in ["", "/a", "a/", "a//b", "a/../b", "./a"] {
            assert!(inv.add_digest(&d("aa"), bad, Some("v1/content/x"), false).is_err(), "{bad}");
        }
    }

    #[test]
    fn removed_then_committed_content_is_orphaned() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.add_digest(&d("bb"), "b.txt", Some("v1/content/b.txt"), false).unwrap();
        inv.remove_path("b.txt").unwrap();
        let summary = inv.commit(&fs).unwrap();
        assert_eq!(summary.orphaned, ["v1/content/b.txt"]);
        assert!(!inv.manifest().contains(&d("bb")));
    }

    #[test]
    fn echo_version_repeats_head_state() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.commit(&fs).unwrap();

        inv.begin_version(Some("metadata only".into()), None, true).unwrap();
        assert_eq!(
            inv.add_digest(&d("bb"), "b.txt", Some("v2/content/b.txt"), false).unwrap(),
            AddOutcome::Unchanged
        );
        let summary = inv.commit(&fs).unwrap();
        assert!(!summary.is_modified());
        let v1 = VersionLabel::first();
        let v2 = v1.next().unwrap();
        assert_eq!(inv.version(v1).unwrap().state, inv.version(v2).unwrap().state);
    }

    #[test]
    fn discard_returns_draft_and_keeps_head() {
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        let draft = inv.discard_version().unwrap();
        assert_eq!(draft.new_content().path_count(), 1);
        assert!(inv.head().is_none());
        assert!(inv.manifest().is_empty());
        // can open again
        inv.begin_version(None, None, false).unwrap();
    }

    #[test]
    fn fixity_recorded_for_committed_content() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.add_fixity(DigestAlgorithm::Md5, &d("0123"), "v1/content/a.txt").unwrap();
        inv.add_fixity(DigestAlgorithm::Sha512, &d("aa"), "v1/content/a.txt").unwrap();
        inv.commit(&fs).unwrap();
        assert_eq!(inv.fixity().len(), 1);
        assert!(inv.fixity()[&DigestAlgorithm::Md5].contains(&d("0123")));
    }

    #[test]
    fn padded_labels_continue_width() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.set_version_padding(3).unwrap();
        assert_eq!(inv.begin_version(None, None, false).unwrap().to_string(), "v001");
        inv.commit(&fs).unwrap();
        assert_eq!(inv.next_label().unwrap().to_string(), "v002");
        assert!(inv.set_version_padding(2).is_err());
        assert!(fs.exists("v001/inventory.json").unwrap());
    }

    #[test]
    fn padded_inventory_reloads_past_nine_versions() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.set_version_padding(2).unwrap();
        for _ in 0..10 {
            inv.begin_version(Some("step".into()), jane(), false).unwrap();
            inv.commit(&fs).unwrap();
        }
        assert_eq!(inv.head().unwrap().to_string(), "v10");

        let loaded = crate::io::read_inventory(&fs, "").unwrap();
        assert_eq!(loaded.head(), inv.head());
        assert!(loaded.validate().is_empty());
        assert_eq!(loaded.next_label().unwrap().to_string(), "v11");
        let labels: Vec<String> = loaded.versions().keys().map(|l| l.to_string()).collect();
        assert_eq!(labels.first().map(String::as_str), Some("v01"));
        assert_eq!(labels.last().map(String::as_str), Some("v10"));
    }

    #[test]
    fn replaced_content_gets_fresh_path() {
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        let first = inv.new_content_path("a.txt").unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some(&first), false).unwrap();
        inv.add_digest(&d("aa"), "c.txt", None, false).unwrap();

        let second = inv.new_content_path("a.txt").unwrap();
        assert_eq!(second, "v1/content/2/a.txt");
        inv.add_digest(&d("bb"), "a.txt", Some(&second), true).unwrap();
        assert_eq!(inv.content_paths(&d("aa")), ["v1/content/a.txt"]);
        assert_eq!(inv.content_paths(&d("bb")), ["v1/content/2/a.txt"]);
        assert_eq!(inv.new_content_path("a.txt").unwrap(), "v1/content/3/a.txt");
        assert_eq!(inv.new_content_path("2").unwrap(), "v1/content/2/2");
    }

    #[test]
    fn content_directory_override() {
        let mut inv = new_inventory();
        inv.set_content_directory("data").unwrap();
        inv.begin_version(None, None, false).unwrap();
        assert_eq!(inv.new_content_path("a.txt").unwrap(), "v1/data/a.txt");
        assert!(inv.set_content_directory("a/b").is_err());
    }

    #[test]
    fn canonical_json_round_trip_is_byte_identical() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(Some("initial add".into()), jane(), false).unwrap();
        inv.add_digest(&d("bb"), "z.txt", Some("v1/content/z.txt"), false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.add_fixity(DigestAlgorithm::Md5, &d("0123"), "v1/content/a.txt").unwrap();
        inv.commit(&fs).unwrap();

        let first = inv.to_canonical_json().unwrap();
        let parsed = Inventory::from_json(&first).unwrap();
        let second = parsed.to_canonical_json().unwrap();
        assert_eq!(first, second);
        assert_eq!(parsed, inv);
    }

    #[test]
    fn canonical_json_key_order() {
        let fs = MemoryFs::new();
        let mut inv = new_inventory();
        inv.begin_version(Some("m".into()), jane(), false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        inv.commit(&fs).unwrap();
        let json = String::from_utf8(inv.to_canonical_json().unwrap()).unwrap();
        let order = ["\"digestAlgorithm\"", "\"head\"", "\"id\"", "\"manifest\"", "\"type\"", "\"versions\""];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains("\"type\": \"https://ocfl.io/1.1/spec/#inventory\""));
    }

    #[test]
    fn failed_commit_keeps_draft_open() {
        let fs = MemoryFs::new();
        let ro = ocfl_fs::ReadOnlyFs::new(std::sync::Arc::new(fs));
        let mut inv = new_inventory();
        inv.begin_version(None, None, false).unwrap();
        inv.add_digest(&d("aa"), "a.txt", Some("v1/content/a.txt"), false).unwrap();
        assert!(inv.commit(&ro).is_err());
        assert!(inv.is_open());
        assert!(inv.head().is_none());
        assert!(inv.manifest().is_empty());
    }
}
