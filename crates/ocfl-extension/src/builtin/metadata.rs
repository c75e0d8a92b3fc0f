//! `NNNN-metadata`: copies an external metadata file into the extension
//! directory of every object it is active for.
//!
//! The file location comes from the `source` parameter, where `$ID` is
//! replaced by the object id. Each copy gets a sidecar holding its digest in
//! the object's digest algorithm. With `versioned` set, every version also
//! keeps its own copy below `<label>/`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ocfl_digest::digest_bytes;
use ocfl_fs::{path, LocalFs, ReadFs, WriteFs};
use ocfl_types::{Digest, DigestAlgorithm};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{check_name, read_config, to_value, Extension, ObjectView};

pub const METADATA_NAME: &str = "NNNN-metadata";

/// Runtime parameter naming the metadata file.
pub const SOURCE_PARAM: &str = "source";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataConfig {
    pub extension_name: String,
    #[serde(default)]
    pub versioned: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            extension_name: METADATA_NAME.to_string(),
            versioned: false,
        }
    }
}

pub struct Metadata {
    config: MetadataConfig,
    source: Option<String>,
    fs: Option<Arc<dyn WriteFs>>,
}

impl Metadata {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: MetadataConfig) -> ExtensionResult<Self> {
        check_name(METADATA_NAME, &config.extension_name)?;
        Ok(Self {
            config,
            source: None,
            fs: None,
        })
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Local path of the metadata file for object `id`.
    fn resolve_source(&self, source: &str, id: &str) -> ExtensionResult<String> {
        let location = source.replace("$ID", id);
        if let Some(local) = location.strip_prefix("file://") {
            return Ok(local.to_string());
        }
        if let Some((scheme, _)) = location.split_once("://") {
            return Err(ExtensionError::InvalidConfig {
                extension: METADATA_NAME.into(),
                reason: format!("unsupported source scheme {scheme}"),
            });
        }
        Ok(location)
    }

    fn read_source(&self, location: &str) -> ExtensionResult<(String, Vec<u8>)> {
        let local = Path::new(location);
        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ExtensionError::runtime(format!("metadata source {location} has no file name")))?;
        let dir = local.parent().unwrap_or_else(|| Path::new("."));
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        let data = LocalFs::new(dir).read_file(file_name)?;
        Ok((file_name.to_string(), data))
    }

    fn write_with_sidecar(
        fs: &dyn WriteFs,
        target: &str,
        data: &[u8],
        algorithm: DigestAlgorithm,
        digest: &Digest,
    ) -> ExtensionResult<()> {
        fs.replace_file(target, data)?;
        let sidecar = format!("{target}.{algorithm}");
        fs.replace_file(&sidecar, format!("{digest} {target}").as_bytes())?;
        Ok(())
    }
}

impl Extension for Metadata {
    fn name(&self) -> &str {
        METADATA_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ObjectChange]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn set_fs(&mut self, fs: Arc<dyn WriteFs>) {
        self.fs = Some(fs);
    }

    fn set_params(&mut self, params: &BTreeMap<String, String>) -> ExtensionResult<()> {
        if let Some(source) = params.get(SOURCE_PARAM) {
            self.source = Some(source.clone());
        }
        Ok(())
    }

    fn update_object_after(&mut self, object: &ObjectView<'_>) -> ExtensionResult<()> {
        let label = object
            .current_version()
            .ok_or_else(|| ExtensionError::runtime(format!("object {} has no version", object.id())))?;
        let Some(source) = self.source.as_deref() else {
            // later versions keep the file written with the first one
            if label.number() <= 1 {
                return Err(ExtensionError::MissingParam {
                    extension: METADATA_NAME.into(),
                    param: SOURCE_PARAM.into(),
                });
            }
            return Ok(());
        };
        let fs = self
            .fs
            .as_ref()
            .ok_or_else(|| ExtensionError::NoFilesystem(METADATA_NAME.into()))?;

        let location = self.resolve_source(source, object.id())?;
        let (file_name, data) = self.read_source(&location)?;
        let algorithm = object.digest_algorithm();
        let digest = digest_bytes(algorithm, &data);

        Self::write_with_sidecar(fs.as_ref(), &file_name, &data, algorithm, &digest)?;
        if self.config.versioned {
            let versioned = path::join(&label.to_string(), &file_name)?;
            Self::write_with_sidecar(fs.as_ref(), &versioned, &data, algorithm, &digest)?;
        }
        debug!(object_id = %object.id(), source = %location, digest = %digest.short_hex(), "stored object metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ocfl_fs::MemoryFs;
    use ocfl_inventory::Inventory;
    use ocfl_types::OcflVersion;

    use super::*;

    fn extension(versioned: bool, source: Option<String>, fs: &MemoryFs) -> Metadata {
        let mut ext = Metadata::from_config(MetadataConfig {
            versioned,
            ..Default::default()
        })
        .unwrap();
        if let Some(source) = source {
            let mut params = BTreeMap::new();
            params.insert(SOURCE_PARAM.to_string(), source);
            ext.set_params(&params).unwrap();
        }
        ext.set_fs(Arc::new(fs.clone()));
        ext
    }

    fn open_inventory() -> Inventory {
        let mut inv = Inventory::new("obj-7", DigestAlgorithm::Sha256, OcflVersion::V1_1).unwrap();
        inv.begin_version(None, None, false).unwrap();
        inv
    }

    #[test]
    fn copies_source_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("obj-7.json"), br#"{"title":"seven"}"#).unwrap();
        let source = format!("file://{}/$ID.json", dir.path().display());

        let fs = MemoryFs::new();
        let mut ext = extension(true, Some(source), &fs);
        let inv = open_inventory();
        ext.update_object_after(&ObjectView::new("obj-7", &inv)).unwrap();

        let data = fs.read_file("obj-7.json").unwrap();
        assert_eq!(data, br#"{"title":"seven"}"#);
        let digest = digest_bytes(DigestAlgorithm::Sha256, &data);
        assert_eq!(
            fs.read_file("obj-7.json.sha256").unwrap(),
            format!("{digest} obj-7.json").into_bytes()
        );
        assert_eq!(fs.read_file("v1/obj-7.json").unwrap(), data);
        assert!(fs.exists("v1/obj-7.json.sha256").unwrap());
    }

    #[test]
    fn missing_source_fails_only_for_first_version() {
        let fs = MemoryFs::new();
        let mut ext = extension(false, None, &fs);
        let inv = open_inventory();
        assert!(matches!(
            ext.update_object_after(&ObjectView::new("obj-7", &inv)),
            Err(ExtensionError::MissingParam { .. })
        ));

        let mut later = Inventory::new("obj-7", DigestAlgorithm::Sha256, OcflVersion::V1_1).unwrap();
        later.begin_version(None, None, false).unwrap();
        later.commit(&fs).unwrap();
        later.begin_version(None, None, false).unwrap();
        assert!(ext.update_object_after(&ObjectView::new("obj-7", &later)).is_ok());
    }

    #[test]
    fn remote_sources_are_rejected() {
        let fs = MemoryFs::new();
        let mut ext = extension(false, Some("https://example.org/$ID".into()), &fs);
        let inv = open_inventory();
        assert!(matches!(
            ext.update_object_after(&ObjectView::new("obj-7", &inv)),
            Err(ExtensionError::InvalidConfig { .. })
        ));
    }
}
