use std::fmt;
use std::io::{Read, Write};
use std::time::SystemTime;

use crate::error::{FsError, FsResult};
use crate::path;

/// Metadata of one filesystem entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read access to a hierarchical byte store.
///
/// Paths are relative, slash-separated and never contain `..`; the empty
/// string names the root of the store. Implementations must:
/// - return [`FsError::NotFound`] for missing entries, so callers can tell
///   absence from failure;
/// - list directories sorted by name, so every traversal is deterministic;
/// - be safe to share between threads working on disjoint paths.
pub trait ReadFs: Send + Sync + fmt::Debug {
    /// Open a file for streaming reads.
    fn open(&self, path: &str) -> FsResult<Box<dyn Read + Send>>;

    fn stat(&self, path: &str) -> FsResult<FileInfo>;

    /// Immediate children of a directory, sorted by name.
    fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>>;

    /// Human readable location of this store, used in logs and reports.
    fn location(&self) -> String;

    fn exists(&self, path: &str) -> FsResult<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Every file below `path`, relative to `path`, in sorted order.
    ///
    /// Default implementation recurses through [`read_dir`](Self::read_dir).
    /// Backends with a native walk may override.
    fn walk(&self, path: &str) -> FsResult<Vec<String>> {
        let root = path::normalize(path)?;
        let mut files = Vec::new();
        let mut pending = vec![String::new()];
        while let Some(rel) = pending.pop() {
            let dir = path::join(&root, &rel)?;
            for entry in self.read_dir(&dir)? {
                let child = path::join(&rel, &entry.name)?;
                if entry.is_dir {
                    pending.push(child);
                } else {
                    files.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Read-write access to a hierarchical byte store.
///
/// Content files are written once and never modified; only inventories and
/// their sidecars are replaced in place, through [`replace_file`].
///
/// [`replace_file`]: WriteFs::replace_file
pub trait WriteFs: ReadFs {
    /// Create (or truncate) a file, creating parent directories as needed.
    fn create(&self, path: &str) -> FsResult<Box<dyn Write + Send>>;

    /// Remove a file, or a directory with everything below it.
    fn remove(&self, path: &str) -> FsResult<()>;

    /// View of this store as a plain [`ReadFs`].
    fn as_read_fs(&self) -> &dyn ReadFs;

    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let mut writer = self.create(path)?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Replace a file so that readers see either the old or the new bytes.
    ///
    /// The default falls back to [`write_file`](Self::write_file); backends
    /// that can rename atomically override it.
    fn replace_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        self.write_file(path, data)
    }

    /// Flush and release backend resources.
    fn close(&self) -> FsResult<()> {
        Ok(())
    }
}
