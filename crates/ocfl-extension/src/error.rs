use ocfl_fs::FsError;
use ocfl_inventory::InventoryError;
use ocfl_types::ErrorKind;

use crate::capability::Capability;

/// Errors produced by extension construction and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("extension {0} is already registered")]
    Duplicate(String),

    #[error("unknown extension: {0}")]
    Unknown(String),

    #[error("extension config names {found}, expected {expected}")]
    NameMismatch { expected: String, found: String },

    #[error("missing config.json for extension in {0}")]
    MissingConfig(String),

    #[error("invalid config for {extension}: {reason}")]
    InvalidConfig { extension: String, reason: String },

    #[error("extension {extension} requires parameter {param}")]
    MissingParam { extension: String, param: String },

    #[error("extension {extension} does not implement {capability}")]
    Unsupported {
        extension: String,
        capability: Capability,
    },

    #[error("no storage layout extension is active")]
    NoStorageLayout,

    #[error("only one storage layout may be active, found {0:?}")]
    MultipleStorageLayouts(Vec<String>),

    #[error("no extension maps area {0}")]
    UnknownArea(String),

    #[error("{extension} cannot map id {id:?}: {reason}")]
    InvalidId {
        extension: String,
        id: String,
        reason: String,
    },

    #[error("{extension} cannot map path {path:?}: {reason}")]
    InvalidPath {
        extension: String,
        path: String,
        reason: String,
    },

    #[error("extension {0} has no filesystem")]
    NoFilesystem(String),

    #[error("{message}")]
    Runtime { message: String },

    #[error("extension {extension} failed: {source}")]
    Hook {
        extension: String,
        #[source]
        source: Box<ExtensionError>,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtensionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Duplicate(_)
            | Self::Unknown(_)
            | Self::NameMismatch { .. }
            | Self::MissingConfig(_)
            | Self::InvalidConfig { .. }
            | Self::MissingParam { .. }
            | Self::Serialization(_) => ErrorKind::ExtensionInit,
            Self::Unsupported { .. }
            | Self::NoStorageLayout
            | Self::MultipleStorageLayouts(_) => ErrorKind::Configuration,
            Self::UnknownArea(_)
            | Self::InvalidId { .. }
            | Self::InvalidPath { .. }
            | Self::NoFilesystem(_)
            | Self::Runtime { .. }
            | Self::Hook { .. } => ErrorKind::ExtensionRuntime,
            Self::Inventory(e) => e.kind(),
            Self::Fs(e) => e.kind(),
            Self::Io(_) => ErrorKind::Filesystem,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Attribute a hook failure to the extension that raised it.
    pub(crate) fn in_extension(self, extension: &str) -> Self {
        match self {
            already @ Self::Hook { .. } => already,
            other => Self::Hook {
                extension: extension.to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl From<serde_json::Error> for ExtensionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;
