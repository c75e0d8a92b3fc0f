use std::collections::BTreeMap;
use std::path::PathBuf;

use ocfl_extension::DEFAULT_AREA;
use ocfl_types::{DigestAlgorithm, OcflVersion, User};
use serde::{Deserialize, Serialize};

/// Settings for creating or opening a storage root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// OCFL version written to the root declaration. Opening a root uses
    /// the version its declaration names instead.
    pub ocfl_version: OcflVersion,
    /// Digest algorithm of objects created under the root.
    pub digest_algorithm: DigestAlgorithm,
    /// Text of the `ocfl_<version>.md` file written at creation, if any.
    pub documentation: Option<String>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            ocfl_version: OcflVersion::default(),
            digest_algorithm: DigestAlgorithm::Sha512,
            documentation: None,
        }
    }
}

/// One ingest run: how a folder becomes the next version of an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddConfig {
    /// Reuse stored content with the same digest instead of copying it.
    pub deduplicate: bool,
    /// Fixity algorithms for newly created objects.
    pub fixity: Vec<DigestAlgorithm>,
    pub user: Option<User>,
    pub message: Option<String>,
    /// Area the source folder is added to.
    pub default_area: String,
    /// Further local folders, keyed by area.
    pub area_paths: BTreeMap<String, PathBuf>,
    pub echo: bool,
    /// Extensions given to newly created objects, built from their default
    /// configuration.
    pub object_extensions: Vec<String>,
}

impl Default for AddConfig {
    fn default() -> Self {
        Self {
            deduplicate: true,
            fixity: Vec::new(),
            user: None,
            message: None,
            default_area: DEFAULT_AREA.to_string(),
            area_paths: BTreeMap::new(),
            echo: false,
            object_extensions: Vec::new(),
        }
    }
}

impl AddConfig {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_add_config_keeps_defaults() {
        let config: AddConfig =
            serde_json::from_str(r#"{"echo":true,"fixity":["md5"]}"#).unwrap();
        assert!(config.echo);
        assert!(config.deduplicate);
        assert_eq!(config.default_area, "content");
        assert_eq!(config.fixity, [DigestAlgorithm::Md5]);
    }
}
