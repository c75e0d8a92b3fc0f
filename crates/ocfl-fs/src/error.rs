use ocfl_types::ErrorKind;

/// Errors from filesystem backends.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write was attempted through a read-only view.
    #[error("filesystem is read-only: {0}")]
    ReadOnly(String),

    /// The path is absolute, escapes its root, or is otherwise malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A directory operation was applied to a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A file operation was applied to a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// No registered backend accepts the location.
    #[error("no filesystem backend for {0}")]
    NoBackend(String),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoBackend(_) => ErrorKind::Configuration,
            _ => ErrorKind::Filesystem,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Map an I/O error, turning `NotFound` into [`FsError::NotFound`].
    pub(crate) fn from_io(err: std::io::Error, path: &str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io(err)
        }
    }
}

/// Result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
