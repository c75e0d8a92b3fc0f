use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FsError, FsResult};
use crate::path;
use crate::traits::{DirEntry, FileInfo, ReadFs, WriteFs};

/// Local-disk filesystem rooted at a directory.
#[derive(Clone, Debug)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Filesystem rooted at `root`. The directory is created lazily by the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> FsResult<(String, PathBuf)> {
        let rel = path::normalize(path)?;
        let mut full = self.root.clone();
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        Ok((rel, full))
    }

    fn ensure_parent(full: &Path) -> FsResult<()> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ReadFs for LocalFs {
    fn open(&self, path: &str) -> FsResult<Box<dyn Read + Send>> {
        let (rel, full) = self.full_path(path)?;
        if full.is_dir() {
            return Err(FsError::IsADirectory(rel));
        }
        let file = fs::File::open(&full).map_err(|e| FsError::from_io(e, &rel))?;
        Ok(Box::new(file))
    }

    fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let (rel, full) = self.full_path(path)?;
        let meta = fs::metadata(&full).map_err(|e| FsError::from_io(e, &rel))?;
        Ok(FileInfo {
            size: if meta.is_dir() { 0 } else { meta.len() },
            is_dir: meta.is_dir(),
            modified: meta.modified().ok(),
        })
    }

    fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let (rel, full) = self.full_path(path)?;
        if full.is_file() {
            return Err(FsError::NotADirectory(rel));
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| FsError::from_io(e, &rel))? {
            let entry = entry?;
            let name = entry
                .file_name()
                .into_string()
                .map_err(|raw| FsError::InvalidPath(raw.to_string_lossy().into_owned()))?;
            entries.push(DirEntry {
                name,
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn walk(&self, path: &str) -> FsResult<Vec<String>> {
        let (rel, full) = self.full_path(path)?;
        if !full.exists() {
            return Err(FsError::NotFound(rel));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&full).sort_by_file_name() {
            let entry = entry.map_err(|e| FsError::Backend(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&full)
                .map_err(|e| FsError::Backend(e.to_string()))?;
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(segments.join("/"));
        }
        files.sort();
        Ok(files)
    }
}

impl WriteFs for LocalFs {
    fn create(&self, path: &str) -> FsResult<Box<dyn Write + Send>> {
        let (rel, full) = self.full_path(path)?;
        if rel.is_empty() {
            return Err(FsError::InvalidPath(rel));
        }
        Self::ensure_parent(&full)?;
        let file = fs::File::create(&full)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        let (rel, full) = self.full_path(path)?;
        let meta = fs::symlink_metadata(&full).map_err(|e| FsError::from_io(e, &rel))?;
        if meta.is_dir() {
            fs::remove_dir_all(&full)?;
        } else {
            fs::remove_file(&full)?;
        }
        Ok(())
    }

    fn as_read_fs(&self) -> &dyn ReadFs {
        self
    }

    /// Writes to a temporary file in the target directory and renames it
    /// over the destination.
    fn replace_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let (rel, full) = self.full_path(path)?;
        Self::ensure_parent(&full)?;
        let dir = full.parent().unwrap_or(&self.root);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&full).map_err(|e| FsError::Io(e.error))?;
        debug!(path = %rel, bytes = data.len(), "replaced file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_nested_and_walk() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        fs.write_file("b/2.txt", b"two").unwrap();
        fs.write_file("a.txt", b"one").unwrap();
        fs.write_file("b/c/3.txt", b"three").unwrap();

        assert_eq!(fs.walk("").unwrap(), ["a.txt", "b/2.txt", "b/c/3.txt"]);
        assert_eq!(fs.walk("b").unwrap(), ["2.txt", "c/3.txt"]);
        assert_eq!(fs.read_file("b/c/3.txt").unwrap(), b"three");
    }

    #[test]
    fn replace_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        fs.replace_file("inventory.json", b"{}").unwrap();
        fs.replace_file("inventory.json", b"{\"id\":1}").unwrap();
        assert_eq!(fs.read_file("inventory.json").unwrap(), b"{\"id\":1}");
        // no temp files left behind
        assert_eq!(fs.read_dir("").unwrap().len(), 1);
    }

    #[test]
    fn not_found_and_escape() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        assert!(fs.stat("missing").unwrap_err().is_not_found());
        assert!(matches!(fs.open("../etc/passwd"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn remove_file_and_tree() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        fs.write_file("t/x", b"x").unwrap();
        fs.write_file("t/y/z", b"z").unwrap();
        fs.remove("t/x").unwrap();
        assert!(!fs.exists("t/x").unwrap());
        fs.remove("t").unwrap();
        assert!(!fs.exists("t").unwrap());
    }
}
