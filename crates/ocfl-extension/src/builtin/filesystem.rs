//! `NNNN-filesystem`: preserves source filesystem metadata (size and
//! modification time) of ingested files.
//!
//! Lines are collected while a version is open and written as JSON lines to
//! `<label>/filesystem.jsonl.zst` once the version is stored. The metadata
//! capability maps recorded lines back to content digests through each
//! version's state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ocfl_fs::{path, ReadFs, WriteFs};
use ocfl_types::{Digest, VersionLabel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{
    check_name, read_config, to_value, ChangeKind, ContentChange, Extension, ObjectView,
};

pub const FILESYSTEM_NAME: &str = "NNNN-filesystem";

const JSONL_FILE: &str = "filesystem.jsonl";
const ZSTD_LEVEL: i32 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Zstd,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemConfig {
    pub extension_name: String,
    #[serde(default)]
    pub compress: Compression,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            extension_name: FILESYSTEM_NAME.to_string(),
            compress: Compression::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
}

/// One recorded file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLine {
    /// Logical path in the version state.
    pub path: String,
    pub meta: FileMeta,
}

pub struct Filesystem {
    config: FilesystemConfig,
    fs: Option<Arc<dyn WriteFs>>,
    pending: Option<(VersionLabel, Vec<FileLine>)>,
}

impl Filesystem {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: FilesystemConfig) -> ExtensionResult<Self> {
        check_name(FILESYSTEM_NAME, &config.extension_name)?;
        Ok(Self {
            config,
            fs: None,
            pending: None,
        })
    }

    fn file_name(&self) -> String {
        match self.config.compress {
            Compression::None => JSONL_FILE.to_string(),
            Compression::Zstd => format!("{JSONL_FILE}.zst"),
        }
    }

    fn encode(&self, lines: &[FileLine]) -> ExtensionResult<Vec<u8>> {
        let mut data = Vec::new();
        for line in lines {
            serde_json::to_writer(&mut data, line)?;
            data.push(b'\n');
        }
        match self.config.compress {
            Compression::None => Ok(data),
            Compression::Zstd => Ok(zstd::encode_all(data.as_slice(), ZSTD_LEVEL)?),
        }
    }

    fn decode(&self, data: &[u8]) -> ExtensionResult<Vec<FileLine>> {
        let raw = match self.config.compress {
            Compression::None => data.to_vec(),
            Compression::Zstd => zstd::decode_all(data)?,
        };
        raw.split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).map_err(ExtensionError::from))
            .collect()
    }

    /// Lines stored for version `label`, empty if none were recorded.
    pub fn read_lines(&self, label: VersionLabel) -> ExtensionResult<Vec<FileLine>> {
        let Some(fs) = &self.fs else {
            return Ok(Vec::new());
        };
        let file = path::join(&label.to_string(), &self.file_name())?;
        if !fs.exists(&file)? {
            return Ok(Vec::new());
        }
        self.decode(&fs.read_file(&file)?)
    }
}

impl Extension for Filesystem {
    fn name(&self) -> &str {
        FILESYSTEM_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::ContentChange,
            Capability::ObjectChange,
            Capability::Metadata,
        ]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn set_fs(&mut self, fs: Arc<dyn WriteFs>) {
        self.fs = Some(fs);
    }

    fn terminate(&mut self) -> ExtensionResult<()> {
        self.pending = None;
        Ok(())
    }

    fn content_change_after(
        &mut self,
        object: &ObjectView<'_>,
        change: &ContentChange<'_>,
    ) -> ExtensionResult<()> {
        if change.kind == ChangeKind::Delete {
            return Ok(());
        }
        let (Some(label), Some(source_fs)) = (object.current_version(), change.source_fs) else {
            return Ok(());
        };
        // lines left over from a discarded version are dropped
        if self.pending.as_ref().map(|(l, _)| *l) != Some(label) {
            self.pending = Some((label, Vec::new()));
        }
        let mut lines = Vec::with_capacity(change.sources.len());
        for source in change.sources {
            let info = source_fs.stat(source)?;
            lines.push(FileLine {
                path: change.dest.to_string(),
                meta: FileMeta {
                    size: info.size,
                    mtime: info.modified.map(DateTime::<Utc>::from),
                },
            });
        }
        if let Some((_, pending)) = self.pending.as_mut() {
            pending.extend(lines);
        }
        Ok(())
    }

    fn update_object_after(&mut self, object: &ObjectView<'_>) -> ExtensionResult<()> {
        let Some(label) = object.current_version() else {
            return Ok(());
        };
        let lines = match self.pending.take() {
            Some((pending_label, lines)) if pending_label == label && !lines.is_empty() => lines,
            _ => return Ok(()),
        };
        let fs = self
            .fs
            .as_ref()
            .ok_or_else(|| ExtensionError::NoFilesystem(FILESYSTEM_NAME.into()))?;
        let data = self.encode(&lines)?;
        let file = path::join(&label.to_string(), &self.file_name())?;
        fs.write_file(&file, &data)?;
        debug!(object_id = %object.id(), version = %label, files = lines.len(), "stored filesystem metadata");
        Ok(())
    }

    fn metadata(&self, object: &ObjectView<'_>) -> ExtensionResult<BTreeMap<Digest, serde_json::Value>> {
        let mut by_digest: BTreeMap<Digest, Vec<FileLine>> = BTreeMap::new();
        for (label, version) in object.inventory().versions() {
            let state = version.state.paths();
            for line in self.read_lines(*label)? {
                if let Some(&digest) = state.get(line.path.as_str()) {
                    by_digest.entry(digest.clone()).or_default().push(line);
                }
            }
        }
        by_digest
            .into_iter()
            .map(|(digest, lines)| -> ExtensionResult<_> { Ok((digest, serde_json::to_value(lines)?)) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use ocfl_digest::digest_bytes;
    use ocfl_fs::MemoryFs;
    use ocfl_inventory::Inventory;
    use ocfl_types::{DigestAlgorithm, OcflVersion};

    use super::*;

    fn extension(compress: Compression, fs: &MemoryFs) -> Filesystem {
        let mut ext = Filesystem::from_config(FilesystemConfig {
            compress,
            ..Default::default()
        })
        .unwrap();
        ext.set_fs(Arc::new(fs.clone()));
        ext
    }

    fn add(ext: &mut Filesystem, inv: &Inventory, source: &MemoryFs, dest: &str) {
        let sources = [dest.to_string()];
        let change = ContentChange {
            kind: ChangeKind::Add,
            source_fs: Some(source),
            sources: &sources,
            dest,
            area: "content",
            digest: None,
            content_path: None,
        };
        ext.content_change_after(&ObjectView::new(inv.id(), inv), &change)
            .unwrap();
    }

    fn ingest(compress: Compression) -> (MemoryFs, Filesystem, Inventory, Digest) {
        let source = MemoryFs::new();
        source.write_file("a.txt", b"alpha").unwrap();
        let object_fs = MemoryFs::new();
        let ext_fs = MemoryFs::new();
        let mut ext = extension(compress, &ext_fs);

        let mut inv = Inventory::new("obj", DigestAlgorithm::Sha512, OcflVersion::V1_1).unwrap();
        inv.begin_version(None, None, false).unwrap();
        let digest = digest_bytes(DigestAlgorithm::Sha512, b"alpha");
        inv.add_digest(&digest, "a.txt", Some("v1/content/a.txt"), false)
            .unwrap();
        add(&mut ext, &inv, &source, "a.txt");
        inv.commit(&object_fs).unwrap();
        ext.update_object_after(&ObjectView::new("obj", &inv)).unwrap();
        (ext_fs, ext, inv, digest)
    }

    #[test]
    fn records_and_maps_to_digest() {
        let (ext_fs, ext, inv, digest) = ingest(Compression::Zstd);
        assert!(ext_fs.exists("v1/filesystem.jsonl.zst").unwrap());

        let meta = ext.metadata(&ObjectView::new("obj", &inv)).unwrap();
        let lines: Vec<FileLine> = serde_json::from_value(meta[&digest].clone()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].path, "a.txt");
        assert_eq!(lines[0].meta.size, 5);
        assert!(lines[0].meta.mtime.is_some());
    }

    #[test]
    fn uncompressed_is_plain_json_lines() {
        let (ext_fs, _, _, _) = ingest(Compression::None);
        let data = ext_fs.read_file("v1/filesystem.jsonl").unwrap();
        let text = String::from_utf8(data).unwrap();
        assert!(text.starts_with(r#"{"path":"a.txt","meta":{"size":5"#));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn deletes_and_streams_record_nothing() {
        let fs = MemoryFs::new();
        let mut ext = extension(Compression::Zstd, &fs);
        let mut inv = Inventory::new("obj", DigestAlgorithm::Sha512, OcflVersion::V1_1).unwrap();
        inv.begin_version(None, None, false).unwrap();
        let change = ContentChange {
            kind: ChangeKind::Add,
            source_fs: None,
            sources: &[],
            dest: "stream.bin",
            area: "content",
            digest: None,
            content_path: None,
        };
        ext.content_change_after(&ObjectView::new("obj", &inv), &change)
            .unwrap();
        ext.update_object_after(&ObjectView::new("obj", &inv)).unwrap();
        assert!(fs.is_empty());
    }

    #[test]
    fn lines_of_a_discarded_version_are_dropped() {
        let source = MemoryFs::new();
        source.write_file("a.txt", b"alpha").unwrap();
        let fs = MemoryFs::new();
        let mut ext = extension(Compression::None, &fs);

        let mut inv = Inventory::new("obj", DigestAlgorithm::Sha512, OcflVersion::V1_1).unwrap();
        inv.begin_version(None, None, false).unwrap();
        inv.commit(&MemoryFs::new()).unwrap();
        inv.begin_version(None, None, false).unwrap();
        add(&mut ext, &inv, &source, "a.txt");
        inv.discard_version();

        let mut other = Inventory::new("obj", DigestAlgorithm::Sha512, OcflVersion::V1_1).unwrap();
        other.begin_version(None, None, false).unwrap();
        add(&mut ext, &other, &source, "a.txt");
        ext.update_object_after(&ObjectView::new("obj", &other)).unwrap();
        let text = String::from_utf8(fs.read_file("v1/filesystem.jsonl").unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
