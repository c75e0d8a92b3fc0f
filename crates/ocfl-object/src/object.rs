use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use ocfl_digest::{copy_with_digests, digest_reader, DigestSet};
use ocfl_extension::{
    ChangeKind, ContentChange, ExtensionFactory, ExtensionManager, ObjectView,
};
use ocfl_fs::{sub_read, sub_write, FsResult, ReadFs, ReadOnlyFs, WriteFs};
use ocfl_inventory::{read_inventory, CommitSummary, Inventory, InventoryError, INVENTORY_FILE};
use ocfl_types::{Digest, DigestAlgorithm, OcflVersion, User, VersionLabel};
use tracing::{debug, info, warn};

use crate::error::{ObjectError, ObjectResult};

/// Directory below the object root holding extension configuration.
pub const EXTENSIONS_DIR: &str = "extensions";

const DECLARATION_PREFIX: &str = "0=ocfl_object_";

/// Names of the object declaration files at the root of `fs`.
pub fn object_declarations(fs: &dyn ReadFs) -> FsResult<Vec<String>> {
    if !fs.exists("")? {
        return Ok(Vec::new());
    }
    Ok(fs
        .read_dir("")?
        .into_iter()
        .filter(|e| !e.is_dir && e.name.starts_with(DECLARATION_PREFIX))
        .map(|e| e.name)
        .collect())
}

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

/// Settings fixed when an object is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectOptions {
    pub ocfl_version: OcflVersion,
    pub digest_algorithm: DigestAlgorithm,
    /// Extra algorithms recorded in the fixity block.
    pub fixity: Vec<DigestAlgorithm>,
    /// Overrides the `content` directory name inside versions.
    pub content_directory: Option<String>,
    /// Zero-padding width of version labels, 0 for none.
    pub version_padding: usize,
}

impl Default for ObjectOptions {
    fn default() -> Self {
        Self {
            ocfl_version: OcflVersion::default(),
            digest_algorithm: DigestAlgorithm::default(),
            fixity: Vec::new(),
            content_directory: None,
            version_padding: 0,
        }
    }
}

/// What happened to one added file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    /// New logical path; carries the bytes written.
    Added(u64),
    /// Existing logical path got new content; carries the bytes written.
    Updated(u64),
    /// Digest already stored; only the state changed.
    Deduplicated,
    /// Logical path already held this content.
    Unchanged,
    /// Open version is an echo version.
    Ignored,
}

/// Counters for the open update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub added: usize,
    pub updated: usize,
    pub deduplicated: usize,
    pub unchanged: usize,
    pub ignored: usize,
    pub deleted: usize,
    pub bytes_written: u64,
}

impl UpdateStats {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Added(bytes) => {
                self.added += 1;
                self.bytes_written += bytes;
            }
            FileOutcome::Updated(bytes) => {
                self.updated += 1;
                self.bytes_written += bytes;
            }
            FileOutcome::Deduplicated => self.deduplicated += 1,
            FileOutcome::Unchanged => self.unchanged += 1,
            FileOutcome::Ignored => self.ignored += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Content origin
// ---------------------------------------------------------------------------

/// Where the bytes of one added file come from.
enum Origin<'a> {
    Folder { fs: &'a dyn ReadFs, path: &'a str },
    /// Stream spooled to a temporary file, digested on the way in.
    Spool { file: &'a mut File, digests: DigestSet },
}

impl<'a> Origin<'a> {
    fn source_fs(&self) -> Option<&'a dyn ReadFs> {
        match self {
            Origin::Folder { fs, .. } => Some(*fs),
            Origin::Spool { .. } => None,
        }
    }

    fn sources(&self) -> Vec<String> {
        match self {
            Origin::Folder { path, .. } => vec![path.to_string()],
            Origin::Spool { .. } => Vec::new(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Origin::Folder { fs, path } => format!("{}/{path}", fs.location()),
            Origin::Spool { .. } => "<stream>".to_string(),
        }
    }

    fn open(&mut self) -> ObjectResult<Box<dyn Read + '_>> {
        match self {
            Origin::Folder { fs, path } => {
                let reader: Box<dyn Read + '_> = fs.open(path)?;
                Ok(reader)
            }
            Origin::Spool { file, .. } => {
                file.seek(SeekFrom::Start(0))?;
                Ok(Box::new(&mut **file))
            }
        }
    }

    fn digests(&mut self, algorithms: &BTreeSet<DigestAlgorithm>) -> ObjectResult<DigestSet> {
        if let Origin::Spool { digests, .. } = self {
            return Ok(digests.clone());
        }
        let mut reader = self.open()?;
        Ok(digest_reader(&mut reader, algorithms.iter().copied())?)
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// One OCFL object and its update transaction.
///
/// At most one update is open at a time: [`start_update`](Self::start_update)
/// opens a draft version, content is added or deleted, and
/// [`end_update`](Self::end_update) commits it. Extension hooks run around
/// every file and every version, in the manager's load order.
pub struct Object {
    id: String,
    fs: Arc<dyn WriteFs>,
    inventory: Inventory,
    extensions: ExtensionManager,
    fixity: BTreeSet<DigestAlgorithm>,
    update: Option<UpdateStats>,
    modified: bool,
    closed: bool,
}

impl Object {
    /// Initialize a new object in the empty directory `fs`.
    ///
    /// Nothing is written until the first version commits.
    pub fn create(
        fs: Arc<dyn WriteFs>,
        id: &str,
        options: &ObjectOptions,
        mut extensions: ExtensionManager,
    ) -> ObjectResult<Self> {
        if !object_declarations(fs.as_read_fs())?.is_empty() || fs.exists(INVENTORY_FILE)? {
            return Err(ObjectError::AlreadyExists(fs.location()));
        }
        let mut inventory = Inventory::new(id, options.digest_algorithm, options.ocfl_version)?;
        if let Some(dir) = &options.content_directory {
            inventory.set_content_directory(dir)?;
        }
        if options.version_padding > 0 {
            inventory.set_version_padding(options.version_padding)?;
        }
        extensions.set_fs(sub_write(&fs, EXTENSIONS_DIR)?)?;
        let fixity = options
            .fixity
            .iter()
            .copied()
            .chain(extensions.fixity_digests())
            .filter(|alg| *alg != options.digest_algorithm)
            .collect();
        debug!(object_id = %id, location = %fs.location(), "initialized object");
        Ok(Self {
            id: id.to_string(),
            fs,
            inventory,
            extensions,
            fixity,
            update: None,
            modified: false,
            closed: false,
        })
    }

    /// Open the object stored in `fs`, verifying its inventory sidecar and
    /// loading its extensions through `factory`.
    pub fn load(fs: Arc<dyn WriteFs>, factory: &ExtensionFactory) -> ObjectResult<Self> {
        if object_declarations(fs.as_read_fs())?.is_empty() {
            return Err(ObjectError::NotAnObject(fs.location()));
        }
        let inventory = read_inventory(fs.as_read_fs(), "")?;
        let read: Arc<dyn ReadFs> = Arc::new(ReadOnlyFs::new(Arc::clone(&fs)));
        let mut extensions = ExtensionManager::load(factory, &sub_read(&read, EXTENSIONS_DIR)?)?;
        extensions.set_fs(sub_write(&fs, EXTENSIONS_DIR)?)?;
        let algorithm = inventory.digest_algorithm();
        let fixity = inventory
            .fixity()
            .keys()
            .copied()
            .chain(extensions.fixity_digests())
            .filter(|alg| *alg != algorithm)
            .collect();
        debug!(object_id = %inventory.id(), head = ?inventory.head(), "loaded object");
        Ok(Self {
            id: inventory.id().to_string(),
            fs,
            inventory,
            extensions,
            fixity,
            update: None,
            modified: false,
            closed: false,
        })
    }

    /// Like [`load`](Self::load), but the stored id must equal `id`.
    pub fn load_with_id(
        fs: Arc<dyn WriteFs>,
        factory: &ExtensionFactory,
        id: &str,
    ) -> ObjectResult<Self> {
        let object = Self::load(fs, factory)?;
        if object.id != id {
            return Err(ObjectError::IdMismatch {
                expected: id.to_string(),
                found: object.id,
            });
        }
        Ok(object)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn head(&self) -> Option<VersionLabel> {
        self.inventory.head()
    }

    pub fn extensions(&self) -> &ExtensionManager {
        &self.extensions
    }

    pub fn fs(&self) -> &Arc<dyn WriteFs> {
        &self.fs
    }

    /// Algorithms recorded in the fixity block besides the primary one.
    pub fn fixity_algorithms(&self) -> &BTreeSet<DigestAlgorithm> {
        &self.fixity
    }

    /// True when the last committed update added content or changed state.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_updating(&self) -> bool {
        self.update.is_some()
    }

    /// Counters of the open update.
    pub fn update_stats(&self) -> Option<&UpdateStats> {
        self.update.as_ref()
    }

    fn algorithms(&self) -> BTreeSet<DigestAlgorithm> {
        let mut algorithms = self.fixity.clone();
        algorithms.insert(self.inventory.digest_algorithm());
        algorithms
    }

    fn check_open(&self) -> ObjectResult<()> {
        if self.closed {
            return Err(ObjectError::Closed(self.id.clone()));
        }
        Ok(())
    }

    fn require_update(&self) -> ObjectResult<()> {
        self.check_open()?;
        if self.update.is_none() {
            return Err(ObjectError::NoUpdate(self.id.clone()));
        }
        Ok(())
    }

    fn record(&mut self, outcome: FileOutcome) {
        if let Some(stats) = self.update.as_mut() {
            stats.record(outcome);
        }
    }

    // -----------------------------------------------------------------------
    // Update lifecycle
    // -----------------------------------------------------------------------

    /// Open the next version.
    ///
    /// With `echo` set the version will repeat the previous head's state and
    /// added content is ignored.
    pub fn start_update(
        &mut self,
        message: Option<String>,
        user: Option<User>,
        echo: bool,
    ) -> ObjectResult<VersionLabel> {
        self.check_open()?;
        if self.update.is_some() || self.inventory.is_open() {
            return Err(ObjectError::UpdateOpen(self.id.clone()));
        }
        let label = self.inventory.begin_version(message, user, echo)?;
        let view = ObjectView::new(&self.id, &self.inventory);
        if let Err(e) = self.extensions.update_object_before(&view) {
            self.inventory.discard_version();
            return Err(e.into());
        }
        self.update = Some(UpdateStats::default());
        self.modified = false;
        info!(object_id = %self.id, version = %label, echo, "started update");
        Ok(label)
    }

    /// Add every file below the root of `source`, keeping relative paths as
    /// logical paths. Existing logical paths are overwritten.
    pub fn add_folder(
        &mut self,
        source: &dyn ReadFs,
        check_duplicates: bool,
        area: &str,
    ) -> ObjectResult<UpdateStats> {
        self.require_update()?;
        let mut stats = UpdateStats::default();
        for file in source.walk("")? {
            let origin = Origin::Folder {
                fs: source,
                path: &file,
            };
            let outcome = self.add_content(origin, &[file.clone()], area, check_duplicates, true)?;
            stats.record(outcome);
        }
        debug!(
            object_id = %self.id,
            source = %source.location(),
            added = stats.added,
            deduplicated = stats.deduplicated,
            "added folder"
        );
        Ok(stats)
    }

    /// Add the bytes of `reader` under every path in `logical_paths`.
    ///
    /// The stream is spooled to a temporary file while digesting, so it is
    /// read exactly once.
    pub fn add_reader(
        &mut self,
        reader: &mut dyn Read,
        logical_paths: &[String],
        area: &str,
        check_duplicates: bool,
        overwrite: bool,
    ) -> ObjectResult<FileOutcome> {
        self.require_update()?;
        let mut spool = tempfile::tempfile()?;
        let (_, digests) = copy_with_digests(reader, &mut spool, self.algorithms())?;
        let origin = Origin::Spool {
            file: &mut spool,
            digests,
        };
        self.add_content(origin, logical_paths, area, check_duplicates, overwrite)
    }

    fn add_content(
        &mut self,
        mut origin: Origin<'_>,
        logical_paths: &[String],
        area: &str,
        check_duplicates: bool,
        overwrite: bool,
    ) -> ObjectResult<FileOutcome> {
        let algorithm = self.inventory.digest_algorithm();
        let digests = origin.digests(&self.algorithms())?;
        let digest = digests.require(algorithm)?.clone();

        let mut targets = Vec::with_capacity(logical_paths.len());
        let mut replacing = false;
        let view = ObjectView::new(&self.id, &self.inventory);
        for logical in logical_paths {
            let state_path = self.extensions.build_object_state_path(&view, logical, area)?;
            match self.inventory.draft_digest(&state_path) {
                Some(existing) if *existing == digest => continue,
                Some(existing) if !overwrite => {
                    return Err(InventoryError::PathConflict {
                        path: state_path,
                        existing: existing.clone(),
                    }
                    .into())
                }
                Some(_) => replacing = true,
                None => {}
            }
            targets.push(state_path);
        }

        let outcome = if targets.is_empty() {
            FileOutcome::Unchanged
        } else if self.inventory.draft().is_some_and(|d| d.is_echo()) {
            debug!(object_id = %self.id, path = %targets[0], "echo update ignores content");
            FileOutcome::Ignored
        } else if check_duplicates && self.inventory.has_digest(&digest) {
            let prior = self.prior_digests(&targets);
            for target in &targets {
                if let Err(e) = self.inventory.add_digest(&digest, target, None, overwrite) {
                    self.unregister(&prior, None);
                    return Err(e.into());
                }
            }
            debug!(object_id = %self.id, path = %targets[0], digest = %digest.short_hex(), "deduplicated content");
            FileOutcome::Deduplicated
        } else {
            let bytes = self.store_content(&mut origin, &targets, area, &digest, &digests, replacing, overwrite)?;
            if replacing {
                FileOutcome::Updated(bytes)
            } else {
                FileOutcome::Added(bytes)
            }
        };
        self.record(outcome);
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn store_content(
        &mut self,
        origin: &mut Origin<'_>,
        targets: &[String],
        area: &str,
        digest: &Digest,
        digests: &DigestSet,
        replacing: bool,
        overwrite: bool,
    ) -> ObjectResult<u64> {
        let kind = if replacing {
            ChangeKind::Update
        } else {
            ChangeKind::Add
        };
        let sources = origin.sources();
        let dest = &targets[0];
        let content_path = self.inventory.new_content_path(dest)?;
        let prior = self.prior_digests(targets);

        let before = ContentChange {
            kind,
            source_fs: origin.source_fs(),
            sources: &sources,
            dest,
            area,
            digest: None,
            content_path: None,
        };
        self.extensions
            .content_change_before(&ObjectView::new(&self.id, &self.inventory), &before)?;

        let bytes = match self.write_content(origin, &content_path, digest) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.remove_quietly(&content_path);
                return Err(e);
            }
        };
        if let Err(e) = self.register(targets, &content_path, digest, digests, overwrite) {
            self.unregister(&prior, Some(&content_path));
            return Err(e);
        }

        let after = ContentChange {
            digest: Some(digest),
            content_path: Some(&content_path),
            ..before
        };
        self.extensions
            .content_change_after(&ObjectView::new(&self.id, &self.inventory), &after)?;
        Ok(bytes)
    }

    fn write_content(
        &self,
        origin: &mut Origin<'_>,
        content_path: &str,
        expected: &Digest,
    ) -> ObjectResult<u64> {
        let algorithm = self.inventory.digest_algorithm();
        let described = origin.describe();
        let mut reader = origin.open()?;
        let mut writer = self.fs.create(content_path)?;
        let (bytes, written) = copy_with_digests(&mut reader, &mut writer, [algorithm])?;
        drop(writer);
        if written.require(algorithm)? != expected {
            return Err(ObjectError::SourceChanged(described));
        }
        Ok(bytes)
    }

    fn register(
        &mut self,
        targets: &[String],
        content_path: &str,
        digest: &Digest,
        digests: &DigestSet,
        overwrite: bool,
    ) -> ObjectResult<()> {
        let known = self.inventory.has_digest(digest);
        self.inventory
            .add_digest(digest, &targets[0], Some(content_path), overwrite)?;
        if known {
            self.inventory.add_content_copy(digest, content_path)?;
        }
        for target in &targets[1..] {
            self.inventory.add_digest(digest, target, None, overwrite)?;
        }
        let primary = self.inventory.digest_algorithm();
        for (algorithm, fixity) in digests.iter().filter(|(alg, _)| *alg != primary) {
            self.inventory.add_fixity(algorithm, fixity, content_path)?;
        }
        Ok(())
    }

    /// Digest each target holds in the open version before it is changed.
    fn prior_digests<'t>(&self, targets: &'t [String]) -> Vec<(&'t str, Option<Digest>)> {
        targets
            .iter()
            .map(|t| (t.as_str(), self.inventory.draft_digest(t).cloned()))
            .collect()
    }

    /// Undo a failed registration: every target gets back the digest it
    /// held before, and the new content path, if any, is dropped.
    fn unregister(&mut self, prior: &[(&str, Option<Digest>)], content_path: Option<&str>) {
        for (target, digest) in prior {
            let restored = match digest {
                Some(digest) => self.inventory.add_digest(digest, target, None, true).map(|_| ()),
                None => self.inventory.remove_path(target).map(|_| ()),
            };
            if let Err(e) = restored {
                warn!(object_id = %self.id, path = %target, error = %e, "could not restore path");
            }
        }
        let Some(content_path) = content_path else {
            return;
        };
        if let Err(e) = self.inventory.remove_content_path(content_path) {
            warn!(object_id = %self.id, path = %content_path, error = %e, "could not drop content path");
        }
        self.remove_quietly(content_path);
    }

    fn remove_quietly(&self, path: &str) {
        if let Err(e) = self.fs.remove(path) {
            if !e.is_not_found() {
                warn!(object_id = %self.id, path = %path, error = %e, "could not remove content");
            }
        }
    }

    /// Remove a logical path from the open version.
    pub fn delete_file(&mut self, logical_path: &str, area: &str) -> ObjectResult<()> {
        self.require_update()?;
        let view = ObjectView::new(&self.id, &self.inventory);
        let state_path = self
            .extensions
            .build_object_state_path(&view, logical_path, area)?;
        if self.inventory.draft_digest(&state_path).is_none() {
            return Err(ObjectError::PathNotFound(state_path));
        }
        let change = ContentChange {
            kind: ChangeKind::Delete,
            source_fs: None,
            sources: &[],
            dest: &state_path,
            area,
            digest: None,
            content_path: None,
        };
        self.extensions
            .content_change_before(&ObjectView::new(&self.id, &self.inventory), &change)?;
        self.inventory.remove_path(&state_path)?;
        self.extensions
            .content_change_after(&ObjectView::new(&self.id, &self.inventory), &change)?;
        if let Some(stats) = self.update.as_mut() {
            stats.deleted += 1;
        }
        Ok(())
    }

    /// Finish the open update: run object-change hooks, commit the version
    /// and, if an extension asked for it, commit a housekeeping version.
    ///
    /// On failure the update stays open; call
    /// [`discard_update`](Self::discard_update) or [`close`](Self::close).
    pub fn end_update(&mut self) -> ObjectResult<CommitSummary> {
        self.require_update()?;
        let view = ObjectView::new(&self.id, &self.inventory);
        let requesting = self.extensions.need_new_version(&view)?;
        self.extensions.update_object_after(&view)?;
        if self.inventory.head().is_none() {
            self.write_object_files()?;
        }

        let summary = self.inventory.commit(self.fs.as_ref())?;
        for orphan in &summary.orphaned {
            self.remove_quietly(orphan);
        }
        self.modified = summary.is_modified();
        let stats = self.update.take().unwrap_or_default();
        info!(
            object_id = %self.id,
            head = %summary.label,
            added = stats.added,
            updated = stats.updated,
            deduplicated = stats.deduplicated,
            deleted = stats.deleted,
            modified = self.modified,
            "committed update"
        );

        if !requesting.is_empty() {
            self.housekeeping_version(&requesting)?;
        }
        Ok(summary)
    }

    fn write_object_files(&self) -> ObjectResult<()> {
        let version = self.inventory.ocfl_version()?;
        self.fs.write_file(
            &version.object_declaration(),
            version.object_declaration_content().as_bytes(),
        )?;
        if !self.extensions.is_empty() {
            self.extensions.write_config()?;
        }
        Ok(())
    }

    fn housekeeping_version(&mut self, requesting: &[String]) -> ObjectResult<()> {
        let message = format!("housekeeping by {}", requesting.join(", "));
        let label = self.inventory.begin_version(Some(message), None, true)?;
        let view = ObjectView::new(&self.id, &self.inventory);
        if let Err(e) = self.extensions.do_new_version(&view, requesting) {
            self.inventory.discard_version();
            return Err(e.into());
        }
        if let Err(e) = self.inventory.commit(self.fs.as_ref()) {
            self.inventory.discard_version();
            return Err(e.into());
        }
        info!(object_id = %self.id, head = %label, "committed housekeeping version");
        Ok(())
    }

    /// Drop the open update and every content file it wrote.
    ///
    /// Returns `false` if no update was open. Extension hooks that already
    /// ran are not undone.
    pub fn discard_update(&mut self) -> ObjectResult<bool> {
        let Some(draft) = self.inventory.discard_version() else {
            self.update = None;
            return Ok(false);
        };
        self.update = None;
        let dir = draft.label().to_string();
        if self.fs.exists(&dir)? {
            self.fs.remove(&dir)?;
        }
        warn!(object_id = %self.id, version = %draft.label(), "discarded update");
        Ok(true)
    }

    /// Release the object. An open update is discarded. Calling `close`
    /// again does nothing.
    pub fn close(&mut self) -> ObjectResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let discarded = self.discard_update();
        let terminated = self.extensions.terminate();
        let closed = self.fs.close();
        discarded?;
        terminated?;
        closed?;
        debug!(object_id = %self.id, "closed object");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Write the logical state of `version` (head if `None`) into `dest`,
    /// verifying every file against its digest. Returns the number of files.
    pub fn extract(&self, version: Option<VersionLabel>, dest: &dyn WriteFs) -> ObjectResult<usize> {
        let label = match version.or_else(|| self.inventory.head()) {
            Some(label) => label,
            None => return Ok(0),
        };
        let state = &self
            .inventory
            .version(label)
            .ok_or(ObjectError::NoSuchVersion(label))?
            .state;
        let algorithm = self.inventory.digest_algorithm();
        let mut count = 0;
        for (digest, paths) in state.iter() {
            let content = self
                .inventory
                .content_paths(digest)
                .first()
                .map(|p| p.to_string())
                .ok_or_else(|| InventoryError::UnknownDigest(digest.clone()))?;
            for logical in paths {
                let mut reader = self.fs.open(&content)?;
                let mut writer = dest.create(logical)?;
                let (_, written) = copy_with_digests(&mut reader, &mut writer, [algorithm])?;
                let computed = written.require(algorithm)?;
                if computed != digest {
                    return Err(ocfl_digest::DigestError::Mismatch {
                        algorithm,
                        expected: digest.clone(),
                        computed: computed.clone(),
                    }
                    .into());
                }
                count += 1;
            }
        }
        info!(object_id = %self.id, version = %label, files = count, "extracted version");
        Ok(count)
    }

    pub(crate) fn object_view(&self) -> ObjectView<'_> {
        ObjectView::new(&self.id, &self.inventory)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("location", &self.fs.location())
            .field("head", &self.inventory.head())
            .field("updating", &self.update.is_some())
            .finish()
    }
}
