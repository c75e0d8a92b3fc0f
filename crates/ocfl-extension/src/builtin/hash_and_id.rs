//! `0003-hash-and-id-n-tuple-storage-layout`: digest tuples followed by the
//! percent-encoded id.

use ocfl_digest::digest_bytes;
use ocfl_fs::ReadFs;
use ocfl_types::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use super::hashed_ntuple::{check_tuples, default_algorithm, default_tuple, tuples};
use crate::capability::Capability;
use crate::error::ExtensionResult;
use crate::extension::{check_name, read_config, to_value, Extension};

pub const HASH_AND_ID_NAME: &str = "0003-hash-and-id-n-tuple-storage-layout";

/// Encoded ids longer than this are truncated and suffixed with the digest.
const MAX_ENCODED_ID: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashAndIdConfig {
    pub extension_name: String,
    #[serde(default = "default_algorithm")]
    pub digest_algorithm: DigestAlgorithm,
    #[serde(default = "default_tuple")]
    pub tuple_size: usize,
    #[serde(default = "default_tuple")]
    pub number_of_tuples: usize,
}

impl Default for HashAndIdConfig {
    fn default() -> Self {
        Self {
            extension_name: HASH_AND_ID_NAME.to_string(),
            digest_algorithm: default_algorithm(),
            tuple_size: default_tuple(),
            number_of_tuples: default_tuple(),
        }
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_-]`, lowercase hex.
fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push_str(&hex::encode([byte]));
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct HashAndId {
    config: HashAndIdConfig,
}

impl HashAndId {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: HashAndIdConfig) -> ExtensionResult<Self> {
        check_name(HASH_AND_ID_NAME, &config.extension_name)?;
        check_tuples(
            HASH_AND_ID_NAME,
            config.digest_algorithm,
            config.tuple_size,
            config.number_of_tuples,
        )?;
        Ok(Self { config })
    }
}

impl Extension for HashAndId {
    fn name(&self) -> &str {
        HASH_AND_ID_NAME
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
        Some("Hashed N-tuple with Object ID Encapsulation Storage Layout".into())
    }

    fn build_storage_root_path(&self, id: &str) -> ExtensionResult<String> {
        let digest = digest_bytes(self.config.digest_algorithm, id.as_bytes());
        let mut encoded = encode_id(id);
        if encoded.len() > MAX_ENCODED_ID {
            encoded.truncate(MAX_ENCODED_ID);
            encoded.push('-');
            encoded.push_str(digest.as_str());
        }
        let mut segments: Vec<&str> =
            tuples(digest.as_str(), self.config.tuple_size, self.config.number_of_tuples);
        segments.push(&encoded);
        Ok(segments.join("/"))
    }
}
