use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use ocfl_extension::{Capability, ExtensionFactory, ExtensionManager};
use ocfl_fs::{path, sub_read, sub_write, LocalFs, ReadFs, ReadOnlyFs, WriteFs};
use ocfl_inventory::{read_inventory, Finding, ValidationCode, ValidationReport};
use ocfl_object::{
    object_declarations, validate_object, Object, ObjectError, ObjectOptions, UpdateStats,
    EXTENSIONS_DIR,
};
use ocfl_types::{DigestAlgorithm, OcflVersion, VersionLabel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::{AddConfig, RootConfig};
use crate::error::{RootError, RootResult};

/// File naming the storage layout of a root.
pub const LAYOUT_FILE: &str = "ocfl_layout.json";

const DECLARATION_PREFIX: &str = "0=ocfl_";

/// Contents of `ocfl_layout.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    pub extension: String,
    pub description: String,
}

/// Outcome of [`StorageRoot::ingest_folder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestSummary {
    pub id: String,
    /// Object directory below the root.
    pub path: String,
    pub head: Option<VersionLabel>,
    pub stats: UpdateStats,
    /// Whether the new version added content or changed state.
    pub modified: bool,
}

fn root_declarations(fs: &dyn ReadFs) -> RootResult<Vec<String>> {
    if !fs.exists("")? {
        return Ok(Vec::new());
    }
    Ok(fs
        .read_dir("")?
        .into_iter()
        .filter(|e| {
            !e.is_dir
                && e.name.starts_with(DECLARATION_PREFIX)
                && !e.name.starts_with("0=ocfl_object_")
        })
        .map(|e| e.name)
        .collect())
}

/// A storage root: objects below one directory, placed by a storage layout
/// extension.
///
/// All operations take `&self`; distinct objects may be processed from
/// several threads at once.
pub struct StorageRoot {
    fs: Arc<dyn WriteFs>,
    version: OcflVersion,
    digest_algorithm: DigestAlgorithm,
    factory: Arc<ExtensionFactory>,
    extensions: ExtensionManager,
    /// Objects created or loaded through this root, id to path.
    touched: Mutex<BTreeMap<String, String>>,
}

impl StorageRoot {
    /// Initialize a new root in `fs`.
    ///
    /// `extensions` must contain exactly one storage layout extension.
    /// Writes the root declaration, `ocfl_layout.json`, the optional
    /// documentation file and every extension's configuration.
    pub fn create(
        fs: Arc<dyn WriteFs>,
        factory: Arc<ExtensionFactory>,
        mut extensions: ExtensionManager,
        config: &RootConfig,
    ) -> RootResult<Self> {
        if !root_declarations(fs.as_read_fs())?.is_empty() {
            return Err(RootError::AlreadyExists(fs.location()));
        }
        let layout = extensions.storage_layout()?;
        let layout_file = LayoutFile {
            extension: layout.name().to_string(),
            description: layout.layout_description().unwrap_or_default(),
        };

        let version = config.ocfl_version;
        fs.write_file(
            &version.root_declaration(),
            version.root_declaration_content().as_bytes(),
        )?;
        fs.write_file(LAYOUT_FILE, &serde_json::to_vec_pretty(&layout_file)?)?;
        if let Some(documentation) = &config.documentation {
            fs.write_file(&version.documentation_name(), documentation.as_bytes())?;
        }
        extensions.set_fs(sub_write(&fs, EXTENSIONS_DIR)?)?;
        extensions.write_config()?;

        info!(
            location = %fs.location(),
            version = %version,
            layout = %layout_file.extension,
            "created storage root"
        );
        Ok(Self {
            fs,
            version,
            digest_algorithm: config.digest_algorithm,
            factory,
            extensions,
            touched: Mutex::new(BTreeMap::new()),
        })
    }

    /// Open an existing root. The OCFL version comes from the root
    /// declaration; `config` supplies the digest algorithm for new objects.
    ///
    /// Without a configured layout extension, the one named in
    /// `ocfl_layout.json` is used with its default configuration.
    pub fn open(
        fs: Arc<dyn WriteFs>,
        factory: Arc<ExtensionFactory>,
        config: &RootConfig,
    ) -> RootResult<Self> {
        let declarations = root_declarations(fs.as_read_fs())?;
        let version = [OcflVersion::V1_0, OcflVersion::V1_1]
            .into_iter()
            .find(|v| declarations.contains(&v.root_declaration()))
            .ok_or_else(|| RootError::NotAStorageRoot(fs.location()))?;

        let read: Arc<dyn ReadFs> = Arc::new(ReadOnlyFs::new(Arc::clone(&fs)));
        let mut extensions = ExtensionManager::load(&factory, &sub_read(&read, EXTENSIONS_DIR)?)?;
        if !extensions.has_capability(Capability::StorageRootPath) {
            if let Some(layout) = read_layout_file(fs.as_read_fs())? {
                debug!(layout = %layout.extension, "using layout named in {LAYOUT_FILE}");
                extensions.add(factory.create_default(&layout.extension)?)?;
            }
        }
        extensions.set_fs(sub_write(&fs, EXTENSIONS_DIR)?)?;

        info!(location = %fs.location(), version = %version, "opened storage root");
        Ok(Self {
            fs,
            version,
            digest_algorithm: config.digest_algorithm,
            factory,
            extensions,
            touched: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn version(&self) -> OcflVersion {
        self.version
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn extensions(&self) -> &ExtensionManager {
        &self.extensions
    }

    pub fn factory(&self) -> &Arc<ExtensionFactory> {
        &self.factory
    }

    fn read_fs(&self) -> Arc<dyn ReadFs> {
        Arc::new(ReadOnlyFs::new(Arc::clone(&self.fs)))
    }

    fn touch(&self, id: &str, path: &str) {
        self.touched
            .lock()
            .expect("lock poisoned")
            .insert(id.to_string(), path.to_string());
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Directory of object `id` below the root.
    pub fn object_path(&self, id: &str) -> RootResult<String> {
        Ok(self.extensions.build_storage_root_path(id)?)
    }

    pub fn object_exists(&self, id: &str) -> RootResult<bool> {
        let fs = sub_write(&self.fs, &self.object_path(id)?)?;
        Ok(!object_declarations(fs.as_read_fs())?.is_empty())
    }

    /// Options for new objects: the root's OCFL version and digest algorithm.
    pub fn object_options(&self) -> ObjectOptions {
        ObjectOptions {
            ocfl_version: self.version,
            digest_algorithm: self.digest_algorithm,
            ..Default::default()
        }
    }

    /// Extension manager with the named extensions in their default
    /// configuration.
    pub fn object_extensions(&self, names: &[String]) -> RootResult<ExtensionManager> {
        let mut manager = ExtensionManager::new();
        for name in names {
            manager.add(self.factory.create_default(name)?)?;
        }
        Ok(manager)
    }

    pub fn load_object_by_id(&self, id: &str) -> RootResult<Object> {
        let path = self.object_path(id)?;
        let fs = sub_write(&self.fs, &path)?;
        if object_declarations(fs.as_read_fs())?.is_empty() {
            return Err(RootError::ObjectNotFound(id.to_string()));
        }
        let object = match Object::load_with_id(fs, &self.factory, id) {
            Err(ObjectError::IdMismatch { found, .. }) => {
                return Err(RootError::LayoutCollision {
                    id: id.to_string(),
                    path,
                    existing: found,
                })
            }
            other => other?,
        };
        self.touch(id, &path);
        Ok(object)
    }

    /// Initialize object `id` at its layout path.
    ///
    /// Fails if the path already holds an object, or lies inside one.
    pub fn create_object(
        &self,
        id: &str,
        options: &ObjectOptions,
        extensions: ExtensionManager,
    ) -> RootResult<Object> {
        let path = self.object_path(id)?;
        self.check_placement(id, &path)?;
        let fs = sub_write(&self.fs, &path)?;
        let object = Object::create(fs, id, options, extensions)?;
        self.touch(id, &path);
        debug!(object_id = %id, path = %path, "created object");
        Ok(object)
    }

    fn check_placement(&self, id: &str, object_path: &str) -> RootResult<()> {
        if is_reserved(object_path) {
            return Err(RootError::ReservedPath {
                id: id.to_string(),
                path: object_path.to_string(),
            });
        }
        let mut dir = object_path;
        loop {
            let fs = sub_write(&self.fs, dir)?;
            if !object_declarations(fs.as_read_fs())?.is_empty() {
                let existing = read_inventory(fs.as_read_fs(), "")?.id().to_string();
                if existing == id && dir == object_path {
                    return Err(RootError::ObjectExists {
                        id: id.to_string(),
                        path: dir.to_string(),
                    });
                }
                return Err(RootError::LayoutCollision {
                    id: id.to_string(),
                    path: object_path.to_string(),
                    existing,
                });
            }
            if dir.is_empty() {
                break;
            }
            dir = path::parent(dir);
        }

        if !self.fs.exists(object_path)? {
            return Ok(());
        }
        let mut below = Vec::new();
        self.find_objects(object_path, &mut below)?;
        let Some(nested) = below.first() else {
            return Ok(());
        };
        let fs = sub_write(&self.fs, nested)?;
        Err(RootError::LayoutCollision {
            id: id.to_string(),
            path: object_path.to_string(),
            existing: read_inventory(fs.as_read_fs(), "")?.id().to_string(),
        })
    }

    /// Add `source` as the next version of object `id`, creating the object
    /// if needed. The object is closed afterwards, also on failure.
    pub fn ingest_folder(
        &self,
        config: &AddConfig,
        id: &str,
        source: &dyn ReadFs,
    ) -> RootResult<IngestSummary> {
        let mut object = if self.object_exists(id)? {
            self.load_object_by_id(id)?
        } else {
            let options = ObjectOptions {
                fixity: config.fixity.clone(),
                ..self.object_options()
            };
            let extensions = self.object_extensions(&config.object_extensions)?;
            self.create_object(id, &options, extensions)?
        };

        let updated = Self::update(&mut object, config, source);
        let closed = object.close();
        let stats = updated?;
        closed?;

        let summary = IngestSummary {
            id: id.to_string(),
            path: self.object_path(id)?,
            head: object.head(),
            stats,
            modified: object.is_modified(),
        };
        info!(
            object_id = %id,
            head = ?summary.head,
            modified = summary.modified,
            "ingested folder"
        );
        Ok(summary)
    }

    fn update(object: &mut Object, config: &AddConfig, source: &dyn ReadFs) -> RootResult<UpdateStats> {
        object.start_update(config.message.clone(), config.user.clone(), config.echo)?;
        object.add_folder(source, config.deduplicate, &config.default_area)?;
        for (area, dir) in &config.area_paths {
            object.add_folder(&LocalFs::new(dir), config.deduplicate, area)?;
        }
        let stats = object.update_stats().copied().unwrap_or_default();
        object.end_update()?;
        Ok(stats)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    fn check_root(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let declaration = self.version.root_declaration();
        match self.fs.read_file(&declaration) {
            Ok(data) if data == self.version.root_declaration_content().as_bytes() => {}
            Ok(_) => report.push(Finding::new(
                ValidationCode::E069,
                None,
                format!("{declaration} has unexpected content"),
            )),
            Err(e) => report.push(Finding::new(ValidationCode::E069, None, e.to_string())),
        }
        report
    }

    fn validate_path(&self, path: &str) -> ValidationReport {
        match sub_read(&self.read_fs(), path) {
            Ok(fs) => validate_object(&*fs, &self.factory),
            Err(e) => {
                let mut report = ValidationReport::new();
                report.push(Finding::new(ValidationCode::E034, None, format!("{path}: {e}")));
                report
            }
        }
    }

    /// Root checks plus validation of every object created or loaded
    /// through this root, with duplicate findings merged.
    pub fn validation_status(&self) -> ValidationReport {
        let mut report = self.check_root();
        let touched = self.touched.lock().expect("lock poisoned").clone();
        for path in touched.values() {
            report.merge(self.validate_path(path));
        }
        report.compact()
    }

    /// Directories below the root holding an object declaration, including
    /// any nested inside other objects.
    pub fn object_paths(&self) -> RootResult<Vec<String>> {
        let mut found = Vec::new();
        self.find_objects("", &mut found)?;
        Ok(found)
    }

    fn find_objects(&self, dir: &str, found: &mut Vec<String>) -> RootResult<()> {
        for entry in self.fs.read_dir(dir)? {
            if !entry.is_dir || (dir.is_empty() && entry.name == EXTENSIONS_DIR) {
                continue;
            }
            let child = path::join(dir, &entry.name)?;
            let fs = sub_write(&self.fs, &child)?;
            if !object_declarations(fs.as_read_fs())?.is_empty() {
                found.push(child.clone());
            }
            self.find_objects(&child, found)?;
        }
        Ok(())
    }

    /// Validate the root and every object below it.
    ///
    /// `cancel` is checked between objects; once it fires the report is
    /// returned as is, marked partial.
    pub fn validate(&self, cancel: &CancellationToken) -> RootResult<ValidationReport> {
        let mut report = self.check_root();
        let paths = self.object_paths()?;
        report.extend(nested_objects(&paths));
        for path in paths {
            if cancel.is_cancelled() {
                warn!(checked = report.objects_checked, "validation cancelled");
                report.partial = true;
                break;
            }
            report.merge(self.validate_path(&path));
        }
        info!(
            objects = report.objects_checked,
            findings = report.findings.len(),
            partial = report.partial,
            "validated storage root"
        );
        Ok(report.compact())
    }
}

impl std::fmt::Debug for StorageRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRoot")
            .field("location", &self.fs.location())
            .field("version", &self.version)
            .field("digest_algorithm", &self.digest_algorithm)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Whether objects may not be placed at `object_path`: the root itself, or
/// below a name the root uses for its own files.
fn is_reserved(object_path: &str) -> bool {
    let top = object_path.split('/').next().unwrap_or_default();
    top.is_empty()
        || top == EXTENSIONS_DIR
        || top == LAYOUT_FILE
        || top.starts_with("0=")
        || (top.starts_with("ocfl_") && top.ends_with(".md"))
}

fn nested_objects(paths: &[String]) -> Vec<Finding> {
    let roots: BTreeSet<&str> = paths.iter().map(String::as_str).collect();
    let mut findings = Vec::new();
    for path in &roots {
        let dirs = path.match_indices('/').map(|(i, _)| &path[..i]);
        for dir in dirs.filter(|d| roots.contains(d)) {
            findings.push(Finding::new(
                ValidationCode::E082,
                None,
                format!("object at {path} is nested inside object at {dir}"),
            ));
        }
    }
    findings
}

fn read_layout_file(fs: &dyn ReadFs) -> RootResult<Option<LayoutFile>> {
    if !fs.exists(LAYOUT_FILE)? {
        return Ok(None);
    }
    let data = fs.read_file(LAYOUT_FILE)?;
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| RootError::InvalidLayoutFile {
            file: LAYOUT_FILE.to_string(),
            reason: e.to_string(),
        })
}
