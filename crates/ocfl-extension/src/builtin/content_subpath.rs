//! `NNNN-content-subpath`: named areas mapped to sub paths of the object
//! state, so metadata and payload can live side by side.

use std::collections::BTreeMap;

use ocfl_fs::{path, ReadFs};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{check_name, read_config, to_value, Extension};

pub const CONTENT_SUBPATH_NAME: &str = "NNNN-content-subpath";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubpathEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSubpathConfig {
    pub extension_name: String,
    #[serde(default)]
    pub paths: BTreeMap<String, SubpathEntry>,
}

impl Default for ContentSubpathConfig {
    fn default() -> Self {
        let mut paths = BTreeMap::new();
        paths.insert(
            "metadata".to_string(),
            SubpathEntry {
                path: "metadata".into(),
                description: "descriptive and technical metadata".into(),
            },
        );
        Self {
            extension_name: CONTENT_SUBPATH_NAME.to_string(),
            paths,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentSubpath {
    config: ContentSubpathConfig,
}

impl ContentSubpath {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: ContentSubpathConfig) -> ExtensionResult<Self> {
        check_name(CONTENT_SUBPATH_NAME, &config.extension_name)?;
        for (area, entry) in &config.paths {
            let normalized = path::normalize(&entry.path).map_err(|e| ExtensionError::InvalidConfig {
                extension: CONTENT_SUBPATH_NAME.into(),
                reason: format!("area {area}: {e}"),
            })?;
            if normalized.is_empty() {
                return Err(ExtensionError::InvalidConfig {
                    extension: CONTENT_SUBPATH_NAME.into(),
                    reason: format!("area {area} maps to the object root"),
                });
            }
        }
        Ok(Self { config })
    }
}

impl Extension for ContentSubpath {
    fn name(&self) -> &str {
        CONTENT_SUBPATH_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Area]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn area_path(&self, area: &str) -> ExtensionResult<Option<String>> {
        match self.config.paths.get(area) {
            Some(entry) => Ok(Some(path::normalize(&entry.path)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_areas() {
        let ext = ContentSubpath::from_config(ContentSubpathConfig::default()).unwrap();
        assert_eq!(ext.area_path("metadata").unwrap().as_deref(), Some("metadata"));
        assert_eq!(ext.area_path("content").unwrap(), None);
    }

    #[test]
    fn content_area_can_be_moved() {
        let mut config = ContentSubpathConfig::default();
        config.paths.insert(
            "content".into(),
            SubpathEntry {
                path: "/data/".into(),
                description: String::new(),
            },
        );
        let ext = ContentSubpath::from_config(config).unwrap();
        assert_eq!(ext.area_path("content").unwrap().as_deref(), Some("data"));
    }

    #[test]
    fn root_or_escaping_paths_are_rejected() {
        for bad in ["", "/", "../up"] {
            let mut config = ContentSubpathConfig::default();
            config.paths.insert(
                "x".into(),
                SubpathEntry {
                    path: bad.into(),
                    description: String::new(),
                },
            );
            assert!(ContentSubpath::from_config(config).is_err(), "{bad:?}");
        }
    }
}
