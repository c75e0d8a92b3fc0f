//! `0011-direct-clean-path-layout`: logical paths are kept as given, with
//! characters that break common filesystems replaced segment by segment.

use ocfl_fs::{path, ReadFs};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{check_name, read_config, to_value, Extension, ObjectView};

pub const DIRECT_CLEAN_NAME: &str = "0011-direct-clean-path-layout";

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '\\', '|', '?', '*'];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCleanConfig {
    pub extension_name: String,
    #[serde(default = "default_max_pathname_len")]
    pub max_pathname_len: usize,
    #[serde(default = "default_max_filename_len")]
    pub max_filename_len: usize,
    #[serde(default = "default_replacement")]
    pub replacement_string: String,
    #[serde(default = "default_whitespace_replacement")]
    pub whitespace_replacement_string: String,
}

fn default_max_pathname_len() -> usize {
    32_000
}

fn default_max_filename_len() -> usize {
    127
}

fn default_replacement() -> String {
    "_".into()
}

fn default_whitespace_replacement() -> String {
    " ".into()
}

impl Default for DirectCleanConfig {
    fn default() -> Self {
        Self {
            extension_name: DIRECT_CLEAN_NAME.to_string(),
            max_pathname_len: default_max_pathname_len(),
            max_filename_len: default_max_filename_len(),
            replacement_string: default_replacement(),
            whitespace_replacement_string: default_whitespace_replacement(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectClean {
    config: DirectCleanConfig,
}

impl DirectClean {
    pub fn from_fs(fs: &dyn ReadFs) -> ExtensionResult<Self> {
        Self::from_config(read_config(fs)?)
    }

    pub fn from_config(config: DirectCleanConfig) -> ExtensionResult<Self> {
        check_name(DIRECT_CLEAN_NAME, &config.extension_name)?;
        let unsafe_replacement = |s: &str| s.contains('/') || s.chars().any(|c| FORBIDDEN.contains(&c));
        if unsafe_replacement(&config.replacement_string)
            || unsafe_replacement(&config.whitespace_replacement_string)
        {
            return Err(ExtensionError::InvalidConfig {
                extension: DIRECT_CLEAN_NAME.into(),
                reason: "replacement strings must not contain forbidden characters".into(),
            });
        }
        Ok(Self { config })
    }

    fn clean_segment(&self, segment: &str) -> String {
        let mut out = String::with_capacity(segment.len());
        for c in segment.chars() {
            if c == ' ' {
                out.push(c);
            } else if c.is_whitespace() {
                out.push_str(&self.config.whitespace_replacement_string);
            } else if c.is_control() || FORBIDDEN.contains(&c) {
                out.push_str(&self.config.replacement_string);
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Clean every segment of `logical` and enforce the length limits.
    pub fn clean(&self, logical: &str) -> ExtensionResult<String> {
        let too_long = |reason: String| ExtensionError::InvalidPath {
            extension: DIRECT_CLEAN_NAME.into(),
            path: logical.to_string(),
            reason,
        };
        let mut segments = Vec::new();
        for segment in logical.split('/').filter(|s| !s.is_empty()) {
            let cleaned = self.clean_segment(segment);
            if cleaned.len() > self.config.max_filename_len {
                return Err(too_long(format!(
                    "segment exceeds {} bytes",
                    self.config.max_filename_len
                )));
            }
            segments.push(cleaned);
        }
        let cleaned = path::normalize(&segments.join("/"))?;
        if cleaned.len() > self.config.max_pathname_len {
            return Err(too_long(format!(
                "path exceeds {} bytes",
                self.config.max_pathname_len
            )));
        }
        Ok(cleaned)
    }
}

impl Extension for DirectClean {
    fn name(&self) -> &str {
        DIRECT_CLEAN_NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ObjectContentPath]
    }

    fn config(&self) -> serde_json::Value {
        to_value(&self.config)
    }

    fn is_registered(&self) -> bool {
        true
    }

    fn build_object_state_path(
        &self,
        _object: &ObjectView<'_>,
        path: &str,
        _area: &str,
    ) -> ExtensionResult<String> {
        self.clean(path)
    }
}
