use std::fmt;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex digest: {0}")]
    InvalidDigest(String),

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid version label: {0}")]
    InvalidVersionLabel(String),

    #[error("version label {label} cannot be incremented within {width} digits")]
    VersionOverflow { label: String, width: usize },

    #[error("unsupported OCFL version: {0}")]
    UnsupportedOcflVersion(String),
}

impl TypeError {
    /// Every type error is a configuration or structural input problem.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDigest(_) | Self::InvalidVersionLabel(_) | Self::VersionOverflow { .. } => {
                ErrorKind::InventoryStructure
            }
            Self::UnknownAlgorithm(_) | Self::UnsupportedOcflVersion(_) => ErrorKind::Configuration,
        }
    }
}

/// Classification of engine failures.
///
/// Callers classify failures by kind rather than by the concrete error type
/// of whichever layer produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Read or write against a filesystem backend failed.
    Filesystem,
    /// An extension could not be constructed or configured.
    ExtensionInit,
    /// An extension hook failed while running.
    ExtensionRuntime,
    /// The inventory violates a structural rule.
    InventoryStructure,
    /// Computed and recorded digests disagree.
    DigestMismatch,
    /// Two object ids resolved to the same storage path.
    LayoutCollision,
    /// Configuration failed validation.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Filesystem => "filesystem",
            Self::ExtensionInit => "extension-init",
            Self::ExtensionRuntime => "extension-runtime",
            Self::InventoryStructure => "inventory-structure",
            Self::DigestMismatch => "digest-mismatch",
            Self::LayoutCollision => "layout-collision",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}
