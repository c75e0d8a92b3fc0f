use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{FsError, FsResult};
use crate::path;
use crate::traits::{DirEntry, FileInfo, ReadFs, WriteFs};

/// View of a sub-tree of another filesystem.
///
/// Every path is resolved relative to `prefix`; nothing outside the prefix
/// is reachable. Objects and extension configuration directories are handed
/// out as sub-trees of the storage root.
pub struct SubFs<F: ?Sized> {
    inner: Arc<F>,
    prefix: String,
}

impl<F: ?Sized> SubFs<F> {
    pub fn new(inner: Arc<F>, prefix: &str) -> FsResult<Self> {
        Ok(Self {
            inner,
            prefix: path::normalize(prefix)?,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn inner(&self) -> &Arc<F> {
        &self.inner
    }

    fn resolve(&self, path: &str) -> FsResult<String> {
        path::join(&self.prefix, path)
    }
}

/// Sub-tree view of a shared writable filesystem.
pub fn sub_write(inner: &Arc<dyn WriteFs>, prefix: &str) -> FsResult<Arc<dyn WriteFs>> {
    Ok(Arc::new(SubFs::new(Arc::clone(inner), prefix)?))
}

/// Sub-tree view of a shared read-only filesystem.
pub fn sub_read(inner: &Arc<dyn ReadFs>, prefix: &str) -> FsResult<Arc<dyn ReadFs>> {
    Ok(Arc::new(SubFs::new(Arc::clone(inner), prefix)?))
}

impl<F: ReadFs + ?Sized> fmt::Debug for SubFs<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubFs")
            .field("inner", &self.inner)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl<F: ReadFs + ?Sized> ReadFs for SubFs<F> {
    fn open(&self, path: &str) -> FsResult<Box<dyn Read + Send>> {
        self.inner.open(&self.resolve(path)?)
    }

    fn stat(&self, path: &str) -> FsResult<FileInfo> {
        self.inner.stat(&self.resolve(path)?)
    }

    fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.inner.read_dir(&self.resolve(path)?)
    }

    fn location(&self) -> String {
        format!("{}/{}", self.inner.location().trim_end_matches('/'), self.prefix)
    }

    fn walk(&self, path: &str) -> FsResult<Vec<String>> {
        self.inner.walk(&self.resolve(path)?)
    }
}

impl<F: WriteFs + ?Sized> WriteFs for SubFs<F> {
    fn create(&self, path: &str) -> FsResult<Box<dyn Write + Send>> {
        self.inner.create(&self.resolve(path)?)
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        self.inner.remove(&self.resolve(path)?)
    }

    fn as_read_fs(&self) -> &dyn ReadFs {
        self
    }

    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        self.inner.write_file(&self.resolve(path)?, data)
    }

    fn replace_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        self.inner.replace_file(&self.resolve(path)?, data)
    }
}

/// Read-only view of a writable filesystem.
///
/// Still implements [`WriteFs`] so it can stand in where a writable handle
/// is expected; every mutation fails with [`FsError::ReadOnly`].
pub struct ReadOnlyFs {
    inner: Arc<dyn WriteFs>,
}

impl ReadOnlyFs {
    pub fn new(inner: Arc<dyn WriteFs>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for ReadOnlyFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlyFs").field(&self.inner).finish()
    }
}

impl ReadFs for ReadOnlyFs {
    fn open(&self, path: &str) -> FsResult<Box<dyn Read + Send>> {
        self.inner.open(path)
    }

    fn stat(&self, path: &str) -> FsResult<FileInfo> {
        self.inner.stat(path)
    }

    fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.inner.read_dir(path)
    }

    fn location(&self) -> String {
        self.inner.location()
    }

    fn walk(&self, path: &str) -> FsResult<Vec<String>> {
        self.inner.walk(path)
    }
}

impl WriteFs for ReadOnlyFs {
    fn create(&self, path: &str) -> FsResult<Box<dyn Write + Send>> {
        Err(FsError::ReadOnly(path.to_string()))
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        Err(FsError::ReadOnly(path.to_string()))
    }

    fn as_read_fs(&self) -> &dyn ReadFs {
        self
    }

    fn replace_file(&self, path: &str, _data: &[u8]) -> FsResult<()> {
        Err(FsError::ReadOnly(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFs;

    #[test]
    fn sub_tree_is_scoped() {
        let mem = MemoryFs::new();
        let root: Arc<dyn WriteFs> = Arc::new(mem.clone());
        let object = sub_write(&root, "ab/cd/object-1").unwrap();
        object.write_file("inventory.json", b"{}").unwrap();

        assert_eq!(mem.files(), ["ab/cd/object-1/inventory.json"]);
        assert_eq!(object.walk("").unwrap(), ["inventory.json"]);
        assert!(object.open("../other").is_err());
    }

    #[test]
    fn nested_sub_trees_compose() {
        let mem = MemoryFs::new();
        let root: Arc<dyn WriteFs> = Arc::new(mem.clone());
        let object = sub_write(&root, "obj").unwrap();
        let ext = sub_write(&object, "extensions/NNNN-metadata").unwrap();
        ext.write_file("config.json", b"{}").unwrap();
        assert!(mem.exists("obj/extensions/NNNN-metadata/config.json").unwrap());
    }

    #[test]
    fn read_only_rejects_writes() {
        let mem = MemoryFs::new();
        mem.write_file("a", b"1").unwrap();
        let ro = ReadOnlyFs::new(Arc::new(mem));
        assert_eq!(ro.read_file("a").unwrap(), b"1");
        assert!(matches!(ro.write_file("b", b"2"), Err(FsError::ReadOnly(_))));
        assert!(matches!(ro.remove("a"), Err(FsError::ReadOnly(_))));
    }
}
