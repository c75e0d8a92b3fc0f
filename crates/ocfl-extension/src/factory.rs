use std::collections::BTreeMap;
use std::sync::Arc;

use ocfl_fs::{sub_read, MemoryFs, ReadFs, WriteFs};
use tracing::{debug, warn};

use crate::builtin;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{Extension, CONFIG_FILE};
use crate::manager::INITIAL_NAME;

/// Constructor for one extension, given the directory holding its
/// `config.json`.
pub type ExtensionCreator =
    Box<dyn Fn(&dyn ReadFs) -> ExtensionResult<Box<dyn Extension>> + Send + Sync>;

/// Registry of extension constructors.
///
/// Built once and shared (read-only) by the storage root and every object it
/// opens. Runtime parameters for extensions are kept here too and applied to
/// each instance right after construction.
pub struct ExtensionFactory {
    creators: BTreeMap<String, ExtensionCreator>,
    params: BTreeMap<String, BTreeMap<String, String>>,
}

impl ExtensionFactory {
    /// Empty factory.
    pub fn new() -> Self {
        Self {
            creators: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }

    /// Factory with every built-in extension registered.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        builtin::register_all(&mut factory);
        factory
    }

    /// Register a constructor. Registering a name twice is an error.
    pub fn register<C>(&mut self, name: &str, creator: C) -> ExtensionResult<()>
    where
        C: Fn(&dyn ReadFs) -> ExtensionResult<Box<dyn Extension>> + Send + Sync + 'static,
    {
        if self.creators.contains_key(name) {
            return Err(ExtensionError::Duplicate(name.to_string()));
        }
        self.insert(name, Box::new(creator));
        Ok(())
    }

    pub(crate) fn insert(&mut self, name: &str, creator: ExtensionCreator) {
        self.creators.insert(name.to_string(), creator);
    }

    pub fn has(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    /// Set runtime parameters for every instance of extension `name`.
    pub fn set_params(&mut self, name: &str, params: BTreeMap<String, String>) {
        self.params.insert(name.to_string(), params);
    }

    pub fn params(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.params.get(name)
    }

    /// Construct extension `name` from the configuration directory `fs`.
    ///
    /// The instance must report the name it was registered under.
    pub fn create(&self, name: &str, fs: &dyn ReadFs) -> ExtensionResult<Box<dyn Extension>> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| ExtensionError::Unknown(name.to_string()))?;
        let mut extension = creator(fs)?;
        if extension.name() != name {
            return Err(ExtensionError::NameMismatch {
                expected: name.to_string(),
                found: extension.name().to_string(),
            });
        }
        if let Some(params) = self.params.get(name) {
            extension.set_params(params)?;
        }
        Ok(extension)
    }

    /// Construct an extension from a configuration value; the name is taken
    /// from its `extensionName` field.
    pub fn create_from_json(&self, config: &serde_json::Value) -> ExtensionResult<Box<dyn Extension>> {
        let name = config
            .get("extensionName")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ExtensionError::InvalidConfig {
                extension: "<unnamed>".into(),
                reason: "missing extensionName".into(),
            })?;
        let fs = MemoryFs::new();
        fs.write_file(CONFIG_FILE, &serde_json::to_vec(config)?)?;
        self.create(name, &fs)
    }

    /// Construct extension `name` with its default configuration.
    pub fn create_default(&self, name: &str) -> ExtensionResult<Box<dyn Extension>> {
        let config = builtin::default_config(name)
            .unwrap_or_else(|| serde_json::json!({ "extensionName": name }));
        self.create_from_json(&config)
    }

    /// Instantiate every extension configured below `fs`.
    ///
    /// Each sub-directory is one extension, named like its constructor and
    /// holding a `config.json`. Directories are visited in lexical order.
    /// Unknown extensions and directories without configuration are skipped
    /// with a warning; a configuration naming another extension is an error.
    pub fn load_extensions(&self, fs: &Arc<dyn ReadFs>) -> ExtensionResult<Vec<Box<dyn Extension>>> {
        if !fs.exists("")? {
            return Ok(Vec::new());
        }
        let mut extensions = Vec::new();
        for entry in fs.read_dir("")? {
            if !entry.is_dir || entry.name == INITIAL_NAME {
                continue;
            }
            if !self.has(&entry.name) {
                warn!(extension = %entry.name, location = %fs.location(), "skipping unknown extension");
                continue;
            }
            let dir = sub_read(fs, &entry.name)?;
            if !dir.exists(CONFIG_FILE)? {
                warn!(extension = %entry.name, "skipping extension without config.json");
                continue;
            }
            debug!(extension = %entry.name, "loading extension");
            extensions.push(self.create(&entry.name, &*dir)?);
        }
        Ok(extensions)
    }
}

impl Default for ExtensionFactory {
    fn default() -> Self {
        Self::new()
    }
}
