use std::collections::BTreeMap;
use std::sync::Arc;

use ocfl_fs::{ReadFs, WriteFs};
use ocfl_inventory::Inventory;
use ocfl_types::{Digest, DigestAlgorithm, VersionLabel};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};

/// File holding an extension's configuration inside its directory.
pub const CONFIG_FILE: &str = "config.json";

// ---------------------------------------------------------------------------
// Hook arguments
// ---------------------------------------------------------------------------

/// Read-only view of the object a hook runs for.
///
/// The object owns its extension manager, so hooks get this view instead of
/// the object itself.
#[derive(Clone, Copy, Debug)]
pub struct ObjectView<'a> {
    id: &'a str,
    inventory: &'a Inventory,
}

impl<'a> ObjectView<'a> {
    pub fn new(id: &'a str, inventory: &'a Inventory) -> Self {
        Self { id, inventory }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn inventory(&self) -> &'a Inventory {
        self.inventory
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.inventory.digest_algorithm()
    }

    /// Label of the version being built, or the head when no update is open.
    pub fn current_version(&self) -> Option<VersionLabel> {
        self.inventory
            .draft()
            .map(|d| d.label())
            .or_else(|| self.inventory.head())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

/// One file add, update or delete passed to content-change hooks.
#[derive(Clone, Copy)]
pub struct ContentChange<'a> {
    pub kind: ChangeKind,
    /// Filesystem the content is read from; `None` for deletes and streams.
    pub source_fs: Option<&'a dyn ReadFs>,
    /// Source paths within `source_fs`.
    pub sources: &'a [String],
    /// Logical path in the object state.
    pub dest: &'a str,
    pub area: &'a str,
    /// Digest of the content, known in after-hooks of adds and updates.
    pub digest: Option<&'a Digest>,
    /// Content path the bytes were written to, known in after-hooks.
    pub content_path: Option<&'a str>,
}

impl std::fmt::Debug for ContentChange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentChange")
            .field("kind", &self.kind)
            .field("sources", &self.sources)
            .field("dest", &self.dest)
            .field("area", &self.area)
            .field("digest", &self.digest)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Extension trait
// ---------------------------------------------------------------------------

/// A named, configurable unit taking part in storage operations.
///
/// Every hook has a default so an extension only implements what its
/// [`capabilities`](Self::capabilities) declare. The manager only calls hooks
/// of declared capabilities.
pub trait Extension: Send + Sync {
    /// Registered identifier, also the name of the configuration directory.
    fn name(&self) -> &str;

    fn capabilities(&self) -> &'static [Capability];

    /// Current configuration, as written to `config.json`.
    fn config(&self) -> serde_json::Value;

    /// Whether the extension is in the official OCFL extension registry.
    fn is_registered(&self) -> bool {
        false
    }

    /// Filesystem rooted at this extension's directory, for extensions that
    /// keep data beside their configuration.
    fn set_fs(&mut self, _fs: Arc<dyn WriteFs>) {}

    /// Apply runtime parameters supplied by the caller.
    fn set_params(&mut self, _params: &BTreeMap<String, String>) -> ExtensionResult<()> {
        Ok(())
    }

    fn write_config(&self, fs: &dyn WriteFs) -> ExtensionResult<()> {
        let data = serde_json::to_vec_pretty(&self.config())?;
        fs.write_file(CONFIG_FILE, &data)?;
        Ok(())
    }

    /// Release buffers and handles.
    fn terminate(&mut self) -> ExtensionResult<()> {
        Ok(())
    }

    // StorageRootPath

    /// Summary written to the root's `ocfl_layout.json`.
    fn layout_description(&self) -> Option<String> {
        None
    }

    fn build_storage_root_path(&self, _id: &str) -> ExtensionResult<String> {
        Err(self.unsupported(Capability::StorageRootPath))
    }

    // ObjectContentPath

    fn build_object_state_path(
        &self,
        _object: &ObjectView<'_>,
        path: &str,
        _area: &str,
    ) -> ExtensionResult<String> {
        Ok(path.to_string())
    }

    // Area

    /// Logical path prefix for `area`, or `None` if this extension does not
    /// know the area.
    fn area_path(&self, _area: &str) -> ExtensionResult<Option<String>> {
        Ok(None)
    }

    // ContentChange

    fn content_change_before(
        &mut self,
        _object: &ObjectView<'_>,
        _change: &ContentChange<'_>,
    ) -> ExtensionResult<()> {
        Ok(())
    }

    fn content_change_after(
        &mut self,
        _object: &ObjectView<'_>,
        _change: &ContentChange<'_>,
    ) -> ExtensionResult<()> {
        Ok(())
    }

    // ObjectChange

    fn update_object_before(&mut self, _object: &ObjectView<'_>) -> ExtensionResult<()> {
        Ok(())
    }

    fn update_object_after(&mut self, _object: &ObjectView<'_>) -> ExtensionResult<()> {
        Ok(())
    }

    // FixityDigest

    fn fixity_digests(&self) -> Vec<DigestAlgorithm> {
        Vec::new()
    }

    // Metadata

    fn metadata(
        &self,
        _object: &ObjectView<'_>,
    ) -> ExtensionResult<BTreeMap<Digest, serde_json::Value>> {
        Ok(BTreeMap::new())
    }

    // NewVersion

    fn need_new_version(&self, _object: &ObjectView<'_>) -> ExtensionResult<bool> {
        Ok(false)
    }

    fn do_new_version(&mut self, _object: &ObjectView<'_>) -> ExtensionResult<()> {
        Ok(())
    }

    #[doc(hidden)]
    fn unsupported(&self, capability: Capability) -> ExtensionError {
        ExtensionError::Unsupported {
            extension: self.name().to_string(),
            capability,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration helpers
// ---------------------------------------------------------------------------

/// Fields every extension configuration carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    pub extension_name: String,
}

/// Read and parse `config.json` from an extension directory.
pub fn read_config<T: DeserializeOwned>(fs: &dyn ReadFs) -> ExtensionResult<T> {
    let data = match fs.read_file(CONFIG_FILE) {
        Ok(data) => data,
        Err(e) if e.is_not_found() => return Err(ExtensionError::MissingConfig(fs.location())),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&data)?)
}

/// Reject a configuration written for another extension.
pub fn check_name(expected: &str, found: &str) -> ExtensionResult<()> {
    if expected != found {
        return Err(ExtensionError::NameMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Serialize a configuration struct into the value [`Extension::config`]
/// returns. Configuration structs are plain data and always serialize.
pub(crate) fn to_value<T: Serialize>(config: &T) -> serde_json::Value {
    serde_json::to_value(config).unwrap_or(serde_json::Value::Null)
}
