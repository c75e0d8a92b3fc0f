use ocfl_types::{Digest, DigestAlgorithm, ErrorKind};

/// Errors from digesting operations.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Computed digest differs from the expected one.
    #[error("{algorithm} mismatch: expected {expected}, computed {computed}")]
    Mismatch {
        algorithm: DigestAlgorithm,
        expected: Digest,
        computed: Digest,
    },

    /// The digester was not configured for the requested algorithm.
    #[error("algorithm {0} was not computed")]
    NotComputed(DigestAlgorithm),

    /// Reading the source or writing the copy failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DigestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mismatch { .. } | Self::NotComputed(_) => ErrorKind::DigestMismatch,
            Self::Io(_) => ErrorKind::Filesystem,
        }
    }
}

/// Result alias for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;
