//! `0001-digest-algorithms`: extra algorithms recorded in the fixity block.

use ocfl_fs::ReadFs;
use ocfl_types::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::ExtensionResult;
use crate::extension::{check_name, read_config, to_value, Extension};

pub const DIGEST_ALGORITHMS_NAME: &str = "0001-digest-algorithms";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestAlgorithmsConfig {
    pub extension_name: String,
    #[serde(default)]
    pub fixity_digests: Vec<DigestAlgorithm>,
}

impl Default for DigestAlgorithmsConfig {
    fn default() -> Self {
        Self {
            extension_name: DIGEST_ALGORITHMS_NAME.to_string(),
            fixity_digests: vec![DigestAlgorithm::Md5],
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestAlgorithms {
    config: DigestAlgorithmsConfig,
}

impl DigestAlgorithms {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: DigestAlgorithmsConfig) -> ExtensionResult<Self> {
        check_name(DIGEST_ALGORITHMS_NAME, &config.extension_name)?;
        Ok(Self { config })
    }
}

impl Extension for DigestAlgorithms {
    fn name(&self) -> &str {
        DIGEST_ALGORITHMS_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::FixityDigest]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn is_registered(&self) -> bool {
        true
    }

    fn fixity_digests(&self) -> Vec<DigestAlgorithm> {
        self.config.fixity_digests.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algorithm_names() {
        let config: DigestAlgorithmsConfig = serde_json::from_str(
            r#"{"extensionName":"0001-digest-algorithms","fixityDigests":["sha1","blake3"]}"#,
        )
        .unwrap();
        let ext = DigestAlgorithms::from_config(config).unwrap();
        assert_eq!(
            ext.fixity_digests(),
            [DigestAlgorithm::Sha1, DigestAlgorithm::Blake3]
        );
    }

    #[test]
    fn unknown_algorithm_fails_to_parse() {
        let parsed = serde_json::from_str::<DigestAlgorithmsConfig>(
            r#"{"extensionName":"0001-digest-algorithms","fixityDigests":["crc64"]}"#,
        );
        assert!(parsed.is_err());
    }
}
