use ocfl_extension::ExtensionError;
use ocfl_fs::FsError;
use ocfl_inventory::InventoryError;
use ocfl_object::ObjectError;
use ocfl_types::{ErrorKind, TypeError};

/// Errors produced by storage root operations.
#[derive(Debug, thiserror::Error)]
pub enum RootError {
    #[error("storage root already exists at {0}")]
    AlreadyExists(String),

    #[error("no OCFL storage root at {0}")]
    NotAStorageRoot(String),

    #[error("object {0} not found")]
    ObjectNotFound(String),

    #[error("object {id} already exists at {path}")]
    ObjectExists { id: String, path: String },

    #[error("object {id} maps to {path}, which holds object {existing}")]
    LayoutCollision {
        id: String,
        path: String,
        existing: String,
    },

    #[error("object {id} maps to {path}, which is reserved by the storage root")]
    ReservedPath { id: String, path: String },

    #[error("invalid {file}: {reason}")]
    InvalidLayoutFile { file: String, reason: String },

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RootError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists(_) | Self::ObjectNotFound(_) | Self::ObjectExists { .. } => {
                ErrorKind::Configuration
            }
            Self::NotAStorageRoot(_) | Self::InvalidLayoutFile { .. } | Self::Serialization(_) => {
                ErrorKind::InventoryStructure
            }
            Self::LayoutCollision { .. } | Self::ReservedPath { .. } => ErrorKind::LayoutCollision,
            Self::Object(e) => e.kind(),
            Self::Extension(e) => e.kind(),
            Self::Inventory(e) => e.kind(),
            Self::Fs(e) => e.kind(),
            Self::Type(e) => e.kind(),
        }
    }
}

impl From<serde_json::Error> for RootError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for storage root operations.
pub type RootResult<T> = Result<T, RootError>;
