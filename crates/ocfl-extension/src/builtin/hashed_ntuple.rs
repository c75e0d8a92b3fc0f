//! `0004-hashed-n-tuple-storage-layout`: the id digest split into tuples,
//! followed by the full digest (or, with `shortObjectRoot`, the remainder).

use ocfl_digest::digest_bytes;
use ocfl_fs::ReadFs;
use ocfl_types::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{check_name, read_config, to_value, Extension};

pub const HASHED_NTUPLE_NAME: &str = "0004-hashed-n-tuple-storage-layout";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedNTupleConfig {
    pub extension_name: String,
    #[serde(default = "default_algorithm")]
    pub digest_algorithm: DigestAlgorithm,
    #[serde(default = "default_tuple")]
    pub tuple_size: usize,
    #[serde(default = "default_tuple")]
    pub number_of_tuples: usize,
    #[serde(default)]
    pub short_object_root: bool,
}

pub(crate) fn default_algorithm() -> DigestAlgorithm {
    DigestAlgorithm::Sha256
}

pub(crate) fn default_tuple() -> usize {
    3
}

impl Default for HashedNTupleConfig {
    fn default() -> Self {
        Self {
            extension_name: HASHED_NTUPLE_NAME.to_string(),
            digest_algorithm: default_algorithm(),
            tuple_size: default_tuple(),
            number_of_tuples: default_tuple(),
            short_object_root: false,
        }
    }
}

/// Check a tuple configuration against the digest length of `algorithm`.
pub(crate) fn check_tuples(
    extension: &str,
    algorithm: DigestAlgorithm,
    tuple_size: usize,
    number_of_tuples: usize,
) -> ExtensionResult<()> {
    let invalid = |reason: String| ExtensionError::InvalidConfig {
        extension: extension.to_string(),
        reason,
    };
    if (tuple_size == 0) != (number_of_tuples == 0) {
        return Err(invalid(
            "tupleSize and numberOfTuples must both be zero or both be positive".into(),
        ));
    }
    if tuple_size * number_of_tuples > algorithm.hex_len() {
        return Err(invalid(format!(
            "{number_of_tuples} tuples of {tuple_size} exceed the {} digest length",
            algorithm
        )));
    }
    Ok(())
}

/// The first `count` tuples of `size` characters of `hex`.
pub(crate) fn tuples(hex: &str, size: usize, count: usize) -> Vec<&str> {
    (0..count).map(|i| &hex[i * size..(i + 1) * size]).collect()
}

#[derive(Debug, Clone)]
pub struct HashedNTuple {
    config: HashedNTupleConfig,
}

impl HashedNTuple {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: HashedNTupleConfig) -> ExtensionResult<Self> {
        check_name(HASHED_NTUPLE_NAME, &config.extension_name)?;
        check_tuples(
            HASHED_NTUPLE_NAME,
            config.digest_algorithm,
            config.tuple_size,
            config.number_of_tuples,
        )?;
        let consumed = config.tuple_size * config.number_of_tuples;
        if config.short_object_root && consumed == config.digest_algorithm.hex_len() {
            return Err(ExtensionError::InvalidConfig {
                extension: HASHED_NTUPLE_NAME.into(),
                reason: "shortObjectRoot needs digest characters left after the tuples".into(),
            });
        }
        Ok(Self { config })
    }
}

impl Extension for HashedNTuple {
    fn name(&self) -> &str {
        HASHED_NTUPLE_NAME
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
        Some("Hashed N-tuple Storage Layout".into())
    }

    fn build_storage_root_path(&self, id: &str) -> ExtensionResult<String> {
        let digest = digest_bytes(self.config.digest_algorithm, id.as_bytes());
        let hex = digest.as_str();
        let size = self.config.tuple_size;
        let count = self.config.number_of_tuples;
        let mut segments = tuples(hex, size, count);
        if self.config.short_object_root {
            segments.push(&hex[size * count..]);
        } else {
            segments.push(hex);
        }
        Ok(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn layout(config: HashedNTupleConfig) -> HashedNTuple {
        HashedNTuple::from_config(config).unwrap()
    }

    #[test]
    fn default_sha256_layout() {
        let path = layout(HashedNTupleConfig::default())
            .build_storage_root_path("object-01")
            .unwrap();
        assert_eq!(
            path,
            "3c0/ff4/240/3c0ff4240c1e116dba14c7627f2319b58aa3d77606d0d90dfc6161608ac987d4"
        );
    }

    #[test]
    fn md5_short_object_root() {
        let ext = layout(HashedNTupleConfig {
            digest_algorithm: DigestAlgorithm::Md5,
            tuple_size: 2,
            number_of_tuples: 15,
            short_object_root: true,
            ..Default::default()
        });
        assert_eq!(
            ext.build_storage_root_path("object-01").unwrap(),
            "ff/75/53/44/92/48/5e/ab/b3/9f/86/35/67/28/88/4e"
        );
        assert_eq!(
            ext.build_storage_root_path("..hor/rib:le-$id").unwrap(),
            "08/31/97/66/fb/6c/29/35/dd/17/5b/94/26/77/17/e0"
        );
    }

    #[test]
    fn zero_tuples_is_the_bare_digest() {
        let ext = layout(HashedNTupleConfig {
            tuple_size: 0,
            number_of_tuples: 0,
            ..Default::default()
        });
        assert_eq!(
            ext.build_storage_root_path("object-01").unwrap(),
            "3c0ff4240c1e116dba14c7627f2319b58aa3d77606d0d90dfc6161608ac987d4"
        );
    }

    #[test]
    fn invalid_tuple_configs() {
        let mixed = HashedNTupleConfig {
            tuple_size: 0,
            ..Default::default()
        };
        assert!(HashedNTuple::from_config(mixed).is_err());

        let too_long = HashedNTupleConfig {
            digest_algorithm: DigestAlgorithm::Md5,
            tuple_size: 4,
            number_of_tuples: 9,
            ..Default::default()
        };
        assert!(HashedNTuple::from_config(too_long).is_err());

        let nothing_left = HashedNTupleConfig {
            digest_algorithm: DigestAlgorithm::Md5,
            tuple_size: 4,
            number_of_tuples: 8,
            short_object_root: true,
            ..Default::default()
        };
        assert!(HashedNTuple::from_config(nothing_left).is_err());
    }

    proptest! {
        #[test]
        fn deterministic_and_collision_free(a in "\\PC{1,40}", b in "\\PC{1,40}") {
            let ext = layout(HashedNTupleConfig::default());
            let pa = ext.build_storage_root_path(&a).unwrap();
            prop_assert_eq!(&pa, &ext.build_storage_root_path(&a).unwrap());
            if a != b {
                prop_assert_ne!(pa, ext.build_storage_root_path(&b).unwrap());
            }
        }
    }
}
