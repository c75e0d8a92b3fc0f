//! `NNNN-pairtree-storage-layout`: pairtree-cleaned id split into shorties,
//! with the cleaned id as the object directory.

use ocfl_fs::ReadFs;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{check_name, read_config, to_value, Extension};

pub const PAIRTREE_NAME: &str = "NNNN-pairtree-storage-layout";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairtreeConfig {
    pub extension_name: String,
    #[serde(default = "default_shorty_length")]
    pub shorty_length: usize,
    /// Prefix removed from ids before cleaning.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri_base: String,
}

fn default_shorty_length() -> usize {
    2
}

impl Default for PairtreeConfig {
    fn default() -> Self {
        Self {
            extension_name: PAIRTREE_NAME.to_string(),
            shorty_length: default_shorty_length(),
            uri_base: String::new(),
        }
    }
}

/// Pairtree character cleaning.
///
/// Bytes outside the visible ASCII range and the characters `"*+,<=>?\^|`
/// become `^xx`; then `/` becomes `=`, `:` becomes `+` and `.` becomes `,`.
pub fn clean_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'"' | b'*' | b'+' | b',' | b'<' | b'=' | b'>' | b'?' | b'\\' | b'^' | b'|' => {
                out.push('^');
                out.push_str(&hex::encode([byte]));
            }
            0x21..=0x7e => out.push(match byte {
                b'/' => '=',
                b':' => '+',
                b'.' => ',',
                other => other as char,
            }),
            _ => {
                out.push('^');
                out.push_str(&hex::encode([byte]));
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct Pairtree {
    config: PairtreeConfig,
}

impl Pairtree {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: PairtreeConfig) -> ExtensionResult<Self> {
        check_name(PAIRTREE_NAME, &config.extension_name)?;
        if config.shorty_length == 0 {
            return Err(ExtensionError::InvalidConfig {
                extension: PAIRTREE_NAME.into(),
                reason: "shortyLength must be positive".into(),
            });
        }
        Ok(Self { config })
    }
}

impl Extension for Pairtree {
    fn name(&self) -> &str {
        PAIRTREE_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::StorageRootPath]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn layout_description(&self) -> Option<String> {
        Some("Pairtree Storage Layout".into())
    }

    fn build_storage_root_path(&self, id: &str) -> ExtensionResult<String> {
        let bare = id.strip_prefix(self.config.uri_base.as_str()).unwrap_or(id);
        if bare.is_empty() {
            return Err(ExtensionError::InvalidId {
                extension: PAIRTREE_NAME.into(),
                id: id.into(),
                reason: "empty id".into(),
            });
        }
        let cleaned = clean_id(bare);
        // cleaned ids are ASCII, so byte chunks are characters
        let mut segments: Vec<&str> = cleaned
            .as_bytes()
            .chunks(self.config.shorty_length)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        segments.push(&cleaned);
        Ok(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn layout() -> Pairtree {
        Pairtree::from_config(PairtreeConfig::default()).unwrap()
    }

    #[test]
    fn ark_identifier() {
        assert_eq!(
            layout().build_storage_root_path("ark:/13030/xt12t3").unwrap(),
            "ar/k+/=1/30/30/=x/t1/2t/3/ark+=13030=xt12t3"
        );
    }

    #[test]
    fn cleaning_rules() {
        assert_eq!(clean_id("a b"), "a^20b");
        assert_eq!(clean_id("x^y"), "x^5ey");
        assert_eq!(clean_id("1.2,3"), "1,2^2c3");
        assert_eq!(clean_id("é"), "^c3^a9");
    }

    #[test]
    fn uri_base_is_stripped() {
        let ext = Pairtree::from_config(PairtreeConfig {
            uri_base: "info:".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ext.build_storage_root_path("info:abc").unwrap(), "ab/c/abc");
        assert!(ext.build_storage_root_path("info:").is_err());
    }

    proptest! {
        #[test]
        fn distinct_ids_never_collide(a in "\\PC{1,24}", b in "\\PC{1,24}") {
            prop_assume!(a != b);
            let ext = layout();
            prop_assert_ne!(
                ext.build_storage_root_path(&a).unwrap(),
                ext.build_storage_root_path(&b).unwrap()
            );
        }
    }
}
