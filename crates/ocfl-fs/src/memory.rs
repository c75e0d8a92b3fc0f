use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use crate::error::{FsError, FsResult};
use crate::path;
use crate::traits::{DirEntry, FileInfo, ReadFs, WriteFs};

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, (Vec<u8>, SystemTime)>,
    writes: u64,
}

/// In-memory filesystem.
///
/// Intended for tests and embedding. Directories exist implicitly while any
/// file lives below them. Clones share the same underlying tree, so a test
/// can keep a handle and inspect what an object wrote.
#[derive(Clone, Default)]
pub struct MemoryFs {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files created since construction.
    pub fn write_count(&self) -> u64 {
        self.state.read().expect("lock poisoned").writes
    }

    /// Every file path in the store, sorted.
    pub fn files(&self) -> Vec<String> {
        let state = self.state.read().expect("lock poisoned");
        state.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().expect("lock poisoned").files.is_empty()
    }

    fn is_dir(state: &MemoryState, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        let prefix = format!("{path}/");
        state
            .files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }
}

impl std::fmt::Debug for MemoryFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFs").field("files", &self.len()).finish()
    }
}

impl ReadFs for MemoryFs {
    fn open(&self, path: &str) -> FsResult<Box<dyn Read + Send>> {
        let path = path::normalize(path)?;
        let state = self.state.read().expect("lock poisoned");
        match state.files.get(&path) {
            Some((data, _)) => Ok(Box::new(Cursor::new(data.clone()))),
            None if Self::is_dir(&state, &path) => Err(FsError::IsADirectory(path)),
            None => Err(FsError::NotFound(path)),
        }
    }

    fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let path = path::normalize(path)?;
        let state = self.state.read().expect("lock poisoned");
        if let Some((data, modified)) = state.files.get(&path) {
            return Ok(FileInfo {
                size: data.len() as u64,
                is_dir: false,
                modified: Some(*modified),
            });
        }
        if Self::is_dir(&state, &path) {
            return Ok(FileInfo {
                size: 0,
                is_dir: true,
                modified: None,
            });
        }
        Err(FsError::NotFound(path))
    }

    fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let path = path::normalize(path)?;
        let state = self.state.read().expect("lock poisoned");
        if state.files.contains_key(&path) {
            return Err(FsError::NotADirectory(path));
        }
        if !Self::is_dir(&state, &path) {
            return Err(FsError::NotFound(path));
        }
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut entries: BTreeMap<String, bool> = BTreeMap::new();
        for key in state.files.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => {
                    entries.insert(dir.to_string(), true);
                }
                None => {
                    entries.entry(rest.to_string()).or_insert(false);
                }
            }
        }
        Ok(entries
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    fn location(&self) -> String {
        "memory:".to_string()
    }
}

impl WriteFs for MemoryFs {
    fn create(&self, path: &str) -> FsResult<Box<dyn Write + Send>> {
        let path = path::normalize(path)?;
        if path.is_empty() {
            return Err(FsError::InvalidPath(path));
        }
        let mut state = self.state.write().expect("lock poisoned");
        if Self::is_dir(&state, &path) {
            return Err(FsError::IsADirectory(path));
        }
        state.writes += 1;
        state.files.insert(path.clone(), (Vec::new(), SystemTime::now()));
        Ok(Box::new(MemoryWriter {
            state: Arc::clone(&self.state),
            path,
            buf: Vec::new(),
        }))
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        let path = path::normalize(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        if state.files.remove(&path).is_some() {
            return Ok(());
        }
        if !Self::is_dir(&state, &path) {
            return Err(FsError::NotFound(path));
        }
        if path.is_empty() {
            state.files.clear();
        } else {
            let prefix = format!("{path}/");
            state.files.retain(|k, _| !k.starts_with(&prefix));
        }
        Ok(())
    }

    fn as_read_fs(&self) -> &dyn ReadFs {
        self
    }
}

/// Buffers writes and publishes them on flush and drop.
struct MemoryWriter {
    state: Arc<RwLock<MemoryState>>,
    path: String,
    buf: Vec<u8>,
}

impl MemoryWriter {
    fn publish(&self) {
        let mut state = self.state.write().expect("lock poisoned");
        state
            .files
            .insert(self.path.clone(), (self.buf.clone(), SystemTime::now()));
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let fs = MemoryFs::new();
        fs.write_file("a/b.txt", b"hello").unwrap();
        assert_eq!(fs.read_file("a/b.txt").unwrap(), b"hello");
        assert_eq!(fs.stat("a/b.txt").unwrap().size, 5);
        assert!(fs.stat("a").unwrap().is_dir);
    }

    #[test]
    fn missing_file_is_not_found() {
        let fs = MemoryFs::new();
        assert!(matches!(fs.open("nope"), Err(FsError::NotFound(_))));
        assert!(!fs.exists("nope").unwrap());
    }

    #[test]
    fn read_dir_is_sorted_and_shallow() {
        let fs = MemoryFs::new();
        fs.write_file("z.txt", b"").unwrap();
        fs.write_file("d/one.txt", b"").unwrap();
        fs.write_file("d/sub/two.txt", b"").unwrap();
        fs.write_file("a.txt", b"").unwrap();

        let root = fs.read_dir("").unwrap();
        let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "d", "z.txt"]);
        assert!(root[1].is_dir);

        let walked = fs.walk("d").unwrap();
        assert_eq!(walked, ["one.txt", "sub/two.txt"]);
    }

    #[test]
    fn read_dir_on_file_fails() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"x").unwrap();
        assert!(matches!(fs.read_dir("f"), Err(FsError::NotADirectory(_))));
    }

    #[test]
    fn remove_directory_recursively() {
        let fs = MemoryFs::new();
        fs.write_file("v1/content/a", b"a").unwrap();
        fs.write_file("v1/content/b", b"b").unwrap();
        fs.write_file("v2/content/c", b"c").unwrap();
        fs.remove("v1").unwrap();
        assert_eq!(fs.files(), ["v2/content/c"]);
        assert!(fs.remove("v1").is_err());
    }

    #[test]
    fn clones_share_state_and_count_writes() {
        let fs = MemoryFs::new();
        let handle = fs.clone();
        fs.write_file("x", b"1").unwrap();
        fs.replace_file("x", b"2").unwrap();
        assert_eq!(handle.read_file("x").unwrap(), b"2");
        assert_eq!(handle.write_count(), 2);
    }

    #[test]
    fn writer_publishes_on_drop() {
        let fs = MemoryFs::new();
        {
            let mut w = fs.create("streamed").unwrap();
            w.write_all(b"chunk one ").unwrap();
            w.write_all(b"chunk two").unwrap();
        }
        assert_eq!(fs.read_file("streamed").unwrap(), b"chunk one chunk two");
    }
}
