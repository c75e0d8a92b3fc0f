//! Aggregated object metadata: versions, files and what extensions add.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ocfl_types::{Digest, DigestAlgorithm, User, VersionLabel};
use serde::Serialize;

use crate::error::ObjectResult;
use crate::object::Object;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VersionMetadata {
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Everything known about one stored digest.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Manifest paths holding the bytes.
    pub content_paths: Vec<String>,
    /// Other digests of the same bytes, from the fixity block.
    pub fixity: BTreeMap<DigestAlgorithm, Digest>,
    /// Logical paths per version the digest appears in.
    pub version_names: BTreeMap<VersionLabel, Vec<String>>,
    /// Extension contributions keyed by extension name.
    pub extension: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub id: String,
    pub digest_algorithm: DigestAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<VersionLabel>,
    pub versions: BTreeMap<VersionLabel, VersionMetadata>,
    pub files: BTreeMap<Digest, FileMetadata>,
}

impl Object {
    /// Collect inventory facts and every metadata extension's contribution,
    /// merged by digest.
    pub fn metadata(&self) -> ObjectResult<ObjectMetadata> {
        let inventory = self.inventory();
        let mut files: BTreeMap<Digest, FileMetadata> = BTreeMap::new();

        for (digest, paths) in inventory.manifest() {
            let entry = files.entry(digest.clone()).or_default();
            entry.content_paths = paths.iter().cloned().collect();
        }
        let manifest = inventory.manifest().paths();
        for (algorithm, map) in inventory.fixity() {
            for (fixity, paths) in map {
                for path in paths {
                    if let Some(&digest) = manifest.get(path.as_str()) {
                        files
                            .entry(digest.clone())
                            .or_default()
                            .fixity
                            .insert(*algorithm, fixity.clone());
                    }
                }
            }
        }

        let mut versions = BTreeMap::new();
        for (label, version) in inventory.versions() {
            versions.insert(
                *label,
                VersionMetadata {
                    created: version.created,
                    message: version.message.clone(),
                    user: version.user.clone(),
                },
            );
            for (digest, paths) in &version.state {
                files
                    .entry(digest.clone())
                    .or_default()
                    .version_names
                    .insert(*label, paths.iter().cloned().collect());
            }
        }

        let view = self.object_view();
        for (digest, by_extension) in self.extensions().collect_metadata(&view)? {
            files.entry(digest).or_default().extension.extend(by_extension);
        }

        Ok(ObjectMetadata {
            id: inventory.id().to_string(),
            digest_algorithm: inventory.digest_algorithm(),
            head: inventory.head(),
            versions,
            files,
        })
    }
}
