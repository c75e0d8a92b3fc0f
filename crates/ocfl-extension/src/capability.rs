use std::fmt;

use serde::{Deserialize, Serialize};

/// A hook interface an extension can implement.
///
/// Extensions declare their capabilities up front; the manager builds one
/// ordered handler list per capability from those declarations and never
/// probes an extension for methods it did not declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Maps an object id to its path below the storage root.
    StorageRootPath,
    /// Rewrites logical paths before they enter the object state.
    ObjectContentPath,
    /// Maps a named area (`metadata`, ...) to a logical path prefix.
    Area,
    /// Runs before and after each file add, update or delete.
    ContentChange,
    /// Runs before and after each version commit.
    ObjectChange,
    /// Requests extra fixity algorithms.
    FixityDigest,
    /// Contributes per-digest entries to the object metadata report.
    Metadata,
    /// May ask for an additional housekeeping version.
    NewVersion,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Self::StorageRootPath,
        Self::ObjectContentPath,
        Self::Area,
        Self::ContentChange,
        Self::ObjectChange,
        Self::FixityDigest,
        Self::Metadata,
        Self::NewVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorageRootPath => "StorageRootPath",
            Self::ObjectContentPath => "ObjectContentPath",
            Self::Area => "Area",
            Self::ContentChange => "ContentChange",
            Self::ObjectChange => "ObjectChange",
            Self::FixityDigest => "FixityDigest",
            Self::Metadata => "Metadata",
            Self::NewVersion => "NewVersion",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
