//! Extensions shipped with the engine.
//!
//! | name | capabilities |
//! |------|--------------|
//! | `0001-digest-algorithms` | FixityDigest |
//! | `0002-flat-direct-storage-layout` | StorageRootPath |
//! | `0003-hash-and-id-n-tuple-storage-layout` | StorageRootPath |
//! | `0004-hashed-n-tuple-storage-layout` | StorageRootPath |
//! | `0011-direct-clean-path-layout` | ObjectContentPath |
//! | `NNNN-content-subpath` | Area |
//! | `NNNN-filesystem` | ContentChange, ObjectChange, Metadata |
//! | `NNNN-metadata` | ObjectChange |
//! | `NNNN-pairtree-storage-layout` | StorageRootPath |

pub mod content_subpath;
pub mod digest_algorithms;
pub mod direct_clean;
pub mod filesystem;
pub mod flat_direct;
pub mod hash_and_id;
pub mod hashed_ntuple;
pub mod metadata;
pub mod pairtree;

use ocfl_fs::ReadFs;

use crate::error::ExtensionResult;
use crate::extension::{to_value, Extension};
use crate::factory::{ExtensionCreator, ExtensionFactory};

fn creator<E, F>(build: F) -> ExtensionCreator
where
    E: Extension + 'static,
    F: Fn(&dyn ReadFs) -> ExtensionResult<E> + Send + Sync + 'static,
{
    Box::new(move |fs: &dyn ReadFs| Ok(Box::new(build(fs)?) as Box<dyn Extension>))
}

/// Register every built-in extension with `factory`, replacing any
/// constructor already registered under the same name.
pub(crate) fn register_all(factory: &mut ExtensionFactory) {
    factory.insert(
        digest_algorithms::DIGEST_ALGORITHMS_NAME,
        creator(digest_algorithms::DigestAlgorithms::from_fs),
    );
    factory.insert(flat_direct::FLAT_DIRECT_NAME, creator(flat_direct::FlatDirect::from_fs));
    factory.insert(hash_and_id::HASH_AND_ID_NAME, creator(hash_and_id::HashAndId::from_fs));
    factory.insert(
        hashed_ntuple::HASHED_NTUPLE_NAME,
        creator(hashed_ntuple::HashedNTuple::from_fs),
    );
    factory.insert(direct_clean::DIRECT_CLEAN_NAME, creator(direct_clean::DirectClean::from_fs));
    factory.insert(
        content_subpath::CONTENT_SUBPATH_NAME,
        creator(content_subpath::ContentSubpath::from_fs),
    );
    factory.insert(filesystem::FILESYSTEM_NAME, creator(filesystem::Filesystem::from_fs));
    factory.insert(metadata::METADATA_NAME, creator(metadata::Metadata::from_fs));
    factory.insert(pairtree::PAIRTREE_NAME, creator(pairtree::Pairtree::from_fs));
}

/// Default configuration of a built-in extension.
pub fn default_config(name: &str) -> Option<serde_json::Value> {
    let value = match name {
        digest_algorithms::DIGEST_ALGORITHMS_NAME => {
            to_value(&digest_algorithms::DigestAlgorithmsConfig::default())
        }
        flat_direct::FLAT_DIRECT_NAME => to_value(&flat_direct::FlatDirectConfig::default()),
        hash_and_id::HASH_AND_ID_NAME => to_value(&hash_and_id::HashAndIdConfig::default()),
        hashed_ntuple::HASHED_NTUPLE_NAME => to_value(&hashed_ntuple::HashedNTupleConfig::default()),
        direct_clean::DIRECT_CLEAN_NAME => to_value(&direct_clean::DirectCleanConfig::default()),
        content_subpath::CONTENT_SUBPATH_NAME => {
            to_value(&content_subpath::ContentSubpathConfig::default())
        }
        filesystem::FILESYSTEM_NAME => to_value(&filesystem::FilesystemConfig::default()),
        metadata::METADATA_NAME => to_value(&metadata::MetadataConfig::default()),
        pairtree::PAIRTREE_NAME => to_value(&pairtree::PairtreeConfig::default()),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_has_a_default_that_builds() {
        let factory = ExtensionFactory::with_builtin();
        let names: Vec<String> = factory.names().map(str::to_string).collect();
        assert_eq!(names.len(), 9);
        for name in names {
            let config = default_config(&name).unwrap();
            assert_eq!(config["extensionName"], name.as_str());
            let ext = factory.create_from_json(&config).unwrap();
            assert_eq!(ext.name(), name);
            assert_eq!(ext.config(), config);
        }
    }
}
