use ocfl_digest::DigestError;
use ocfl_extension::ExtensionError;
use ocfl_fs::FsError;
use ocfl_inventory::InventoryError;
use ocfl_types::{ErrorKind, TypeError, VersionLabel};

/// Errors produced by object operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("object already exists at {0}")]
    AlreadyExists(String),

    #[error("no OCFL object at {0}")]
    NotAnObject(String),

    #[error("object id is {found}, expected {expected}")]
    IdMismatch { expected: String, found: String },

    #[error("object {0} already has an open update")]
    UpdateOpen(String),

    #[error("object {0} has no open update")]
    NoUpdate(String),

    #[error("object {0} is closed")]
    Closed(String),

    #[error("{0} is not part of the open version")]
    PathNotFound(String),

    #[error("version {0} does not exist")]
    NoSuchVersion(VersionLabel),

    #[error("source {0} changed while it was being added")]
    SourceChanged(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists(_)
            | Self::UpdateOpen(_)
            | Self::NoUpdate(_)
            | Self::Closed(_)
            | Self::PathNotFound(_)
            | Self::NoSuchVersion(_) => ErrorKind::Configuration,
            Self::NotAnObject(_) | Self::IdMismatch { .. } => ErrorKind::InventoryStructure,
            Self::SourceChanged(_) => ErrorKind::DigestMismatch,
            Self::Inventory(e) => e.kind(),
            Self::Extension(e) => e.kind(),
            Self::Fs(e) => e.kind(),
            Self::Digest(e) => e.kind(),
            Self::Type(e) => e.kind(),
            Self::Io(_) => ErrorKind::Filesystem,
        }
    }
}

/// Result alias for object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
