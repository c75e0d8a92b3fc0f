use ocfl_fs::FsError;
use ocfl_types::{Digest, DigestAlgorithm, ErrorKind, TypeError, VersionLabel};

/// Errors produced by inventory operations.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("a version is already open: {0}")]
    VersionAlreadyOpen(VersionLabel),

    #[error("no version is open")]
    NoOpenVersion,

    #[error("logical path {path} already holds {existing}")]
    PathConflict { path: String, existing: Digest },

    #[error("logical path {path} conflicts with {other}")]
    NestedPath { path: String, other: String },

    #[error("digest {0} is not in the manifest and no content path was given")]
    UnknownDigest(Digest),

    #[error("invalid logical or content path: {0}")]
    InvalidPath(String),

    #[error("{0} cannot be used as the inventory digest algorithm")]
    InvalidAlgorithm(DigestAlgorithm),

    #[error("missing inventory sidecar in {0}")]
    MissingSidecar(String),

    #[error("malformed sidecar {path}: {reason}")]
    MalformedSidecar { path: String, reason: String },

    #[error("inventory digest mismatch at {path}: sidecar {expected}, computed {computed}")]
    DigestMismatch {
        path: String,
        expected: Digest,
        computed: Digest,
    },

    #[error("inventory structure: {0}")]
    Structure(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DigestMismatch { .. } => ErrorKind::DigestMismatch,
            Self::InvalidAlgorithm(_) => ErrorKind::Configuration,
            Self::Fs(e) => e.kind(),
            Self::Type(e) => e.kind(),
            _ => ErrorKind::InventoryStructure,
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
