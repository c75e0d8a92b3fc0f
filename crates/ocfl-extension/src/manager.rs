use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ocfl_fs::{path, sub_write, ReadFs, WriteFs};
use ocfl_types::{Digest, DigestAlgorithm};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{read_config, ContentChange, Extension, ObjectView, CONFIG_FILE};
use crate::factory::ExtensionFactory;

/// Directory name of the manager's own configuration.
pub const INITIAL_NAME: &str = "initial";

/// Area every path belongs to unless the caller names another one.
pub const DEFAULT_AREA: &str = "content";

/// Configuration of the manager itself, stored in `initial/config.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialConfig {
    pub extension_name: String,
    /// Extensions dispatched first, in this order. The rest follow sorted
    /// by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    /// Extensions left out of a capability's dispatch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exclusion: BTreeMap<Capability, Vec<String>>,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            extension_name: INITIAL_NAME.to_string(),
            order: Vec::new(),
            exclusion: BTreeMap::new(),
        }
    }
}

impl InitialConfig {
    fn is_default(&self) -> bool {
        self.order.is_empty() && self.exclusion.is_empty()
    }

    fn excludes(&self, capability: Capability, name: &str) -> bool {
        self.exclusion
            .get(&capability)
            .is_some_and(|names| names.iter().any(|n| n == name))
    }
}

/// The active extensions of one storage root or object.
///
/// Dispatch order is fixed when the manager is built: names listed in the
/// initial configuration first, the rest lexically. Every capability keeps
/// its own handler list in that order, and a failing hook stops the
/// extensions after it from running for that call.
pub struct ExtensionManager {
    extensions: Vec<Box<dyn Extension>>,
    handlers: BTreeMap<Capability, Vec<usize>>,
    initial: InitialConfig,
    fs: Option<Arc<dyn WriteFs>>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            handlers: BTreeMap::new(),
            initial: InitialConfig::default(),
            fs: None,
        }
    }

    /// Build a manager from instantiated extensions.
    pub fn from_extensions(
        extensions: Vec<Box<dyn Extension>>,
        initial: InitialConfig,
    ) -> ExtensionResult<Self> {
        let mut manager = Self {
            extensions,
            handlers: BTreeMap::new(),
            initial,
            fs: None,
        };
        manager.reindex()?;
        Ok(manager)
    }

    /// Load every extension configured below `fs` (an `extensions`
    /// directory), including the manager's own `initial` configuration.
    pub fn load(factory: &ExtensionFactory, fs: &Arc<dyn ReadFs>) -> ExtensionResult<Self> {
        let extensions = factory.load_extensions(fs)?;
        let initial_config = path::join(INITIAL_NAME, CONFIG_FILE)?;
        let initial = if fs.exists(&initial_config)? {
            let dir = ocfl_fs::sub_read(fs, INITIAL_NAME)?;
            read_config::<InitialConfig>(&*dir)?
        } else {
            InitialConfig::default()
        };
        Self::from_extensions(extensions, initial)
    }

    /// Add one extension. Names must be unique within a manager.
    pub fn add(&mut self, extension: Box<dyn Extension>) -> ExtensionResult<()> {
        if self.get(extension.name()).is_some() {
            return Err(ExtensionError::Duplicate(extension.name().to_string()));
        }
        if let Some(fs) = &self.fs {
            let mut extension = extension;
            extension.set_fs(sub_write(fs, extension.name())?);
            self.extensions.push(extension);
        } else {
            self.extensions.push(extension);
        }
        self.reindex()
    }

    pub fn set_initial(&mut self, initial: InitialConfig) -> ExtensionResult<()> {
        self.initial = initial;
        self.reindex()
    }

    pub fn initial(&self) -> &InitialConfig {
        &self.initial
    }

    fn reindex(&mut self) -> ExtensionResult<()> {
        let order = &self.initial.order;
        self.extensions.sort_by(|a, b| {
            let rank = |name: &str| order.iter().position(|n| n == name).unwrap_or(usize::MAX);
            rank(a.name())
                .cmp(&rank(b.name()))
                .then_with(|| a.name().cmp(b.name()))
        });

        self.handlers.clear();
        for (index, extension) in self.extensions.iter().enumerate() {
            for capability in extension.capabilities() {
                if self.initial.excludes(*capability, extension.name()) {
                    continue;
                }
                self.handlers.entry(*capability).or_default().push(index);
            }
        }

        let layouts = self.names_for(Capability::StorageRootPath);
        if layouts.len() > 1 {
            return Err(ExtensionError::MultipleStorageLayouts(layouts));
        }
        Ok(())
    }

    fn indices(&self, capability: Capability) -> Vec<usize> {
        self.handlers.get(&capability).cloned().unwrap_or_default()
    }

    /// Names of extensions handling `capability`, in dispatch order.
    pub fn names_for(&self, capability: Capability) -> Vec<String> {
        self.indices(capability)
            .into_iter()
            .map(|i| self.extensions[i].name().to_string())
            .collect()
    }

    /// All extension names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.handlers.get(&capability).is_some_and(|h| !h.is_empty())
    }

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------

    /// Hand every extension a filesystem rooted at its own directory below
    /// `fs` (an `extensions` directory).
    pub fn set_fs(&mut self, fs: Arc<dyn WriteFs>) -> ExtensionResult<()> {
        for extension in &mut self.extensions {
            extension.set_fs(sub_write(&fs, extension.name())?);
        }
        self.fs = Some(fs);
        Ok(())
    }

    /// Write each extension's `config.json`, plus `initial/config.json` when
    /// the manager configuration is not the default.
    pub fn write_config(&self) -> ExtensionResult<()> {
        let fs = self
            .fs
            .as_ref()
            .ok_or_else(|| ExtensionError::NoFilesystem("manager".into()))?;
        for extension in &self.extensions {
            let dir = sub_write(fs, extension.name())?;
            extension
                .write_config(&*dir)
                .map_err(|e| e.in_extension(extension.name()))?;
        }
        if !self.initial.is_default() {
            let data = serde_json::to_vec_pretty(&self.initial)?;
            fs.write_file(&path::join(INITIAL_NAME, CONFIG_FILE)?, &data)?;
        }
        Ok(())
    }

    /// Terminate every extension. All are terminated even if one fails; the
    /// first failure is returned.
    pub fn terminate(&mut self) -> ExtensionResult<()> {
        let mut first_error = None;
        for extension in &mut self.extensions {
            if let Err(e) = extension.terminate() {
                let name = extension.name().to_string();
                first_error.get_or_insert(e.in_extension(&name));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // -----------------------------------------------------------------------
    // Path resolution
    // -----------------------------------------------------------------------

    /// The single active storage layout.
    pub fn storage_layout(&self) -> ExtensionResult<&dyn Extension> {
        let index = self
            .indices(Capability::StorageRootPath)
            .first()
            .copied()
            .ok_or(ExtensionError::NoStorageLayout)?;
        Ok(self.extensions[index].as_ref())
    }

    /// Object id to its path below the storage root.
    pub fn build_storage_root_path(&self, id: &str) -> ExtensionResult<String> {
        let layout = self.storage_layout()?;
        let path = layout
            .build_storage_root_path(id)
            .map_err(|e| e.in_extension(layout.name()))?;
        debug!(object_id = %id, path = %path, layout = %layout.name(), "resolved object path");
        Ok(path)
    }

    /// Logical path under which `original` enters the object state.
    ///
    /// The area is resolved first: `content` (or empty) maps to the state
    /// root unless an area extension maps it elsewhere, any other area must
    /// be known to an area extension. The result then passes through every
    /// object-content-path extension in order.
    pub fn build_object_state_path(
        &self,
        object: &ObjectView<'_>,
        original: &str,
        area: &str,
    ) -> ExtensionResult<String> {
        let area = if area.is_empty() { DEFAULT_AREA } else { area };
        let mut prefix = None;
        for i in self.indices(Capability::Area) {
            let extension = &self.extensions[i];
            if let Some(p) = extension
                .area_path(area)
                .map_err(|e| e.in_extension(extension.name()))?
            {
                prefix = Some(p);
                break;
            }
        }
        let mut path = match prefix {
            Some(prefix) => path::join(&prefix, original)?,
            None if area == DEFAULT_AREA => path::normalize(original)?,
            None => return Err(ExtensionError::UnknownArea(area.to_string())),
        };
        for i in self.indices(Capability::ObjectContentPath) {
            let extension = &self.extensions[i];
            path = extension
                .build_object_state_path(object, &path, area)
                .map_err(|e| e.in_extension(extension.name()))?;
        }
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Hook dispatch
    // -----------------------------------------------------------------------

    fn dispatch<F>(&mut self, capability: Capability, mut hook: F) -> ExtensionResult<()>
    where
        F: FnMut(&mut dyn Extension) -> ExtensionResult<()>,
    {
        for i in self.indices(capability) {
            let extension = self.extensions[i].as_mut();
            if let Err(e) = hook(extension) {
                return Err(e.in_extension(self.extensions[i].name()));
            }
        }
        Ok(())
    }

    pub fn content_change_before(
        &mut self,
        object: &ObjectView<'_>,
        change: &ContentChange<'_>,
    ) -> ExtensionResult<()> {
        self.dispatch(Capability::ContentChange, |e| {
            e.content_change_before(object, change)
        })
    }

    pub fn content_change_after(
        &mut self,
        object: &ObjectView<'_>,
        change: &ContentChange<'_>,
    ) -> ExtensionResult<()> {
        self.dispatch(Capability::ContentChange, |e| {
            e.content_change_after(object, change)
        })
    }

    pub fn update_object_before(&mut self, object: &ObjectView<'_>) -> ExtensionResult<()> {
        self.dispatch(Capability::ObjectChange, |e| e.update_object_before(object))
    }

    pub fn update_object_after(&mut self, object: &ObjectView<'_>) -> ExtensionResult<()> {
        self.dispatch(Capability::ObjectChange, |e| e.update_object_after(object))
    }

    /// Union of the fixity algorithms requested by fixity extensions.
    pub fn fixity_digests(&self) -> BTreeSet<DigestAlgorithm> {
        self.indices(Capability::FixityDigest)
            .into_iter()
            .flat_map(|i| self.extensions[i].fixity_digests())
            .collect()
    }

    /// Metadata of every metadata extension, merged by digest and keyed by
    /// extension name below each digest.
    pub fn collect_metadata(
        &self,
        object: &ObjectView<'_>,
    ) -> ExtensionResult<BTreeMap<Digest, BTreeMap<String, serde_json::Value>>> {
        let mut merged: BTreeMap<Digest, BTreeMap<String, serde_json::Value>> = BTreeMap::new();
        for i in self.indices(Capability::Metadata) {
            let extension = &self.extensions[i];
            let entries = extension
                .metadata(object)
                .map_err(|e| e.in_extension(extension.name()))?;
            for (digest, value) in entries {
                merged
                    .entry(digest)
                    .or_default()
                    .insert(extension.name().to_string(), value);
            }
        }
        Ok(merged)
    }

    /// Names of extensions asking for an extra version.
    pub fn need_new_version(&self, object: &ObjectView<'_>) -> ExtensionResult<Vec<String>> {
        let mut requesting = Vec::new();
        for i in self.indices(Capability::NewVersion) {
            let extension = &self.extensions[i];
            if extension
                .need_new_version(object)
                .map_err(|e| e.in_extension(extension.name()))?
            {
                requesting.push(extension.name().to_string());
            }
        }
        Ok(requesting)
    }

    /// Let the named extensions do their housekeeping in the extra version.
    pub fn do_new_version(
        &mut self,
        object: &ObjectView<'_>,
        requesting: &[String],
    ) -> ExtensionResult<()> {
        self.dispatch(Capability::NewVersion, |e| {
            if requesting.iter().any(|n| n == e.name()) {
                info!(extension = %e.name(), object_id = %object.id(), "extension housekeeping version");
                e.do_new_version(object)
            } else {
                Ok(())
            }
        })
    }
}

impl Default for ExtensionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionManager")
            .field("extensions", &self.names())
            .field("initial", &self.initial)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ocfl_fs::{MemoryFs, ReadOnlyFs};
    use ocfl_inventory::Inventory;
    use ocfl_types::OcflVersion;

    use super::*;
    use crate::builtin::content_subpath::CONTENT_SUBPATH_NAME;
    use crate::builtin::direct_clean::DIRECT_CLEAN_NAME;
    use crate::builtin::flat_direct::FLAT_DIRECT_NAME;
    use crate::builtin::hashed_ntuple::HASHED_NTUPLE_NAME;

    /// Records every hook it sees into a shared log.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        wants_version: bool,
    }

    impl Recorder {
        fn boxed(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Extension> {
            Box::new(Self {
                name,
                log: Arc::clone(log),
                fail_on: None,
                wants_version: false,
            })
        }

        fn record(&self, hook: &str) -> ExtensionResult<()> {
            self.log.lock().unwrap().push(format!("{}:{hook}", self.name));
            if self.fail_on == Some(hook) {
                return Err(ExtensionError::runtime(format!("{hook} refused")));
            }
            Ok(())
        }
    }

    impl Extension for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> &'static [Capability] {
            &[
                Capability::ContentChange,
                Capability::ObjectChange,
                Capability::Metadata,
                Capability::NewVersion,
            ]
        }

        fn config(&self) -> serde_json::Value {
            serde_json::json!({ "extensionName": self.name })
        }

        fn content_change_before(&mut self, _: &ObjectView<'_>, _: &ContentChange<'_>) -> ExtensionResult<()> {
            self.record("before")
        }

        fn content_change_after(&mut self, _: &ObjectView<'_>, _: &ContentChange<'_>) -> ExtensionResult<()> {
            self.record("after")
        }

        fn update_object_after(&mut self, _: &ObjectView<'_>) -> ExtensionResult<()> {
            self.record("object-after")
        }

        fn metadata(&self, _: &ObjectView<'_>) -> ExtensionResult<BTreeMap<Digest, serde_json::Value>> {
            let mut map = BTreeMap::new();
            map.insert(Digest::from_hex("aa").unwrap(), serde_json::json!(self.name));
            Ok(map)
        }

        fn need_new_version(&self, _: &ObjectView<'_>) -> ExtensionResult<bool> {
            Ok(self.wants_version)
        }

        fn do_new_version(&mut self, _: &ObjectView<'_>) -> ExtensionResult<()> {
            self.record("new-version")
        }
    }

    fn inventory() -> Inventory {
        Inventory::new("obj", DigestAlgorithm::Sha512, OcflVersion::V1_1).unwrap()
    }

    fn change<'a>(dest: &'a str) -> ContentChange<'a> {
        ContentChange {
            kind: crate::extension::ChangeKind::Add,
            source_fs: None,
            sources: &[],
            dest,
            area: DEFAULT_AREA,
            digest: None,
            content_path: None,
        }
    }

    #[test]
    fn dispatch_follows_lexical_load_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ExtensionManager::from_extensions(
            vec![Recorder::boxed("b-ext", &log), Recorder::boxed("a-ext", &log)],
            InitialConfig::default(),
        )
        .unwrap();
        let inv = inventory();
        let view = ObjectView::new("obj", &inv);
        manager.content_change_before(&view, &change("x")).unwrap();
        manager.content_change_after(&view, &change("x")).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["a-ext:before", "b-ext:before", "a-ext:after", "b-ext:after"]
        );
    }

    #[test]
    fn explicit_order_comes_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let initial = InitialConfig {
            order: vec!["c-ext".into()],
            ..Default::default()
        };
        let manager = ExtensionManager::from_extensions(
            vec![
                Recorder::boxed("a-ext", &log),
                Recorder::boxed("b-ext", &log),
                Recorder::boxed("c-ext", &log),
            ],
            initial,
        )
        .unwrap();
        assert_eq!(manager.names(), ["c-ext", "a-ext", "b-ext"]);
    }

    #[test]
    fn failing_hook_stops_later_extensions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = Box::new(Recorder {
            name: "a-ext",
            log: Arc::clone(&log),
            fail_on: Some("before"),
            wants_version: false,
        });
        let mut manager = ExtensionManager::from_extensions(
            vec![failing, Recorder::boxed("b-ext", &log)],
            InitialConfig::default(),
        )
        .unwrap();
        let inv = inventory();
        let err = manager
            .content_change_before(&ObjectView::new("obj", &inv), &change("x"))
            .unwrap_err();
        assert!(matches!(&err, ExtensionError::Hook { extension, .. } if extension == "a-ext"));
        assert_eq!(err.kind(), ocfl_types::ErrorKind::ExtensionRuntime);
        assert_eq!(*log.lock().unwrap(), ["a-ext:before"]);
    }

    #[test]
    fn exclusion_removes_extension_from_one_capability() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut exclusion = BTreeMap::new();
        exclusion.insert(Capability::ContentChange, vec!["a-ext".to_string()]);
        let mut manager = ExtensionManager::from_extensions(
            vec![Recorder::boxed("a-ext", &log), Recorder::boxed("b-ext", &log)],
            InitialConfig {
                exclusion,
                ..Default::default()
            },
        )
        .unwrap();
        let inv = inventory();
        let view = ObjectView::new("obj", &inv);
        manager.content_change_before(&view, &change("x")).unwrap();
        manager.update_object_after(&view).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["b-ext:before", "a-ext:object-after", "b-ext:object-after"]
        );
    }

    #[test]
    fn metadata_merges_by_digest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = ExtensionManager::from_extensions(
            vec![Recorder::boxed("a-ext", &log), Recorder::boxed("b-ext", &log)],
            InitialConfig::default(),
        )
        .unwrap();
        let inv = inventory();
        let merged = manager.collect_metadata(&ObjectView::new("obj", &inv)).unwrap();
        let entry = &merged[&Digest::from_hex("aa").unwrap()];
        assert_eq!(entry["a-ext"], "a-ext");
        assert_eq!(entry["b-ext"], "b-ext");
    }

    #[test]
    fn new_version_only_for_requesting_extensions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let wanting = Box::new(Recorder {
            name: "b-ext",
            log: Arc::clone(&log),
            fail_on: None,
            wants_version: true,
        });
        let mut manager = ExtensionManager::from_extensions(
            vec![Recorder::boxed("a-ext", &log), wanting],
            InitialConfig::default(),
        )
        .unwrap();
        let inv = inventory();
        let view = ObjectView::new("obj", &inv);
        let requesting = manager.need_new_version(&view).unwrap();
        assert_eq!(requesting, ["b-ext"]);
        manager.do_new_version(&view, &requesting).unwrap();
        assert_eq!(*log.lock().unwrap(), ["b-ext:new-version"]);
    }

    #[test]
    fn only_one_storage_layout() {
        let factory = ExtensionFactory::with_builtin();
        let err = ExtensionManager::from_extensions(
            vec![
                factory.create_default(FLAT_DIRECT_NAME).unwrap(),
                factory.create_default(HASHED_NTUPLE_NAME).unwrap(),
            ],
            InitialConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExtensionError::MultipleStorageLayouts(_)));
    }

    #[test]
    fn storage_path_requires_layout() {
        let manager = ExtensionManager::new();
        assert!(matches!(
            manager.build_storage_root_path("x"),
            Err(ExtensionError::NoStorageLayout)
        ));
    }

    #[test]
    fn state_path_resolves_area_then_chains() {
        let factory = ExtensionFactory::with_builtin();
        let manager = ExtensionManager::from_extensions(
            vec![
                factory.create_default(CONTENT_SUBPATH_NAME).unwrap(),
                factory.create_default(DIRECT_CLEAN_NAME).unwrap(),
            ],
            InitialConfig::default(),
        )
        .unwrap();
        let inv = inventory();
        let view = ObjectView::new("obj", &inv);
        assert_eq!(
            manager.build_object_state_path(&view, "a:b.txt", "metadata").unwrap(),
            "metadata/a_b.txt"
        );
        assert!(matches!(
            manager.build_object_state_path(&view, "a.txt", "nowhere"),
            Err(ExtensionError::UnknownArea(_))
        ));
    }

    #[test]
    fn default_area_passes_through_without_extensions() {
        let manager = ExtensionManager::new();
        let inv = inventory();
        let view = ObjectView::new("obj", &inv);
        assert_eq!(manager.build_object_state_path(&view, "dir/a.txt", "").unwrap(), "dir/a.txt");
        assert!(manager.build_object_state_path(&view, "a.txt", "metadata").is_err());
    }

    #[test]
    fn write_config_and_load_round_trip() {
        let factory = ExtensionFactory::with_builtin();
        let mem = MemoryFs::new();
        let initial = InitialConfig {
            order: vec![DIRECT_CLEAN_NAME.to_string()],
            ..Default::default()
        };
        let mut manager = ExtensionManager::from_extensions(
            vec![
                factory.create_default(HASHED_NTUPLE_NAME).unwrap(),
                factory.create_default(DIRECT_CLEAN_NAME).unwrap(),
            ],
            initial,
        )
        .unwrap();
        manager.set_fs(Arc::new(mem.clone())).unwrap();
        manager.write_config().unwrap();
        assert!(mem.exists("initial/config.json").unwrap());

        let read: Arc<dyn ReadFs> = Arc::new(ReadOnlyFs::new(Arc::new(mem)));
        let loaded = ExtensionManager::load(&factory, &read).unwrap();
        assert_eq!(loaded.names(), [DIRECT_CLEAN_NAME, HASHED_NTUPLE_NAME]);
        assert!(loaded.has_capability(Capability::StorageRootPath));
    }
}
