//! `0002-flat-direct-storage-layout`: the object id is the directory name.

use ocfl_fs::ReadFs;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{check_name, read_config, to_value, Extension};

pub const FLAT_DIRECT_NAME: &str = "0002-flat-direct-storage-layout";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatDirectConfig {
    pub extension_name: String,
}

impl Default for FlatDirectConfig {
    fn default() -> Self {
        Self {
            extension_name: FLAT_DIRECT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlatDirect {
    config: FlatDirectConfig,
}

impl FlatDirect {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: FlatDirectConfig) -> ExtensionResult<Self> {
        check_name(FLAT_DIRECT_NAME, &config.extension_name)?;
        Ok(Self { config })
    }
}

impl Extension for FlatDirect {
    fn name(&self) -> &str {
        FLAT_DIRECT_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::StorageRootPath]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn is_registered(&self) -> bool {
        true
    }

    fn layout_description(&self) -> Option<String> {
        Some("Flat Direct Storage Layout".into())
    }

    fn build_storage_root_path(&self, id: &str) -> ExtensionResult<String> {
        let reason = match id {
            "" => Some("empty id"),
            "." | ".." => Some("reserved directory name"),
            _ if id.contains('/') || id.contains('\\') => Some("contains a path separator"),
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(ExtensionError::InvalidId {
                extension: FLAT_DIRECT_NAME.into(),
                id: id.into(),
                reason: reason.into(),
            });
        }
        Ok(id.to_string())
    }
}
