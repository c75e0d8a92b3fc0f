//! Helpers for the slash-separated relative paths every backend accepts.

use crate::error::{FsError, FsResult};

/// Normalize a relative path: drop empty and `.` segments, reject `..` and
/// backslashes. The root is the empty string.
pub fn normalize(path: &str) -> FsResult<String> {
    if path.contains('\\') || path.contains('\0') {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(FsError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Join two relative paths and normalize the result.
pub fn join(base: &str, path: &str) -> FsResult<String> {
    normalize(&format!("{base}/{path}"))
}

/// Parent directory of a normalized path (`""` for top-level entries).
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Final segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_noise() {
        assert_eq!(normalize("/a//b/./c/").unwrap(), "a/b/c");
        assert_eq!(normalize("").unwrap(), "");
        assert_eq!(normalize(".").unwrap(), "");
    }

    #[test]
    fn normalize_rejects_escape() {
        assert!(normalize("a/../b").is_err());
        assert!(normalize("..").is_err());
        assert!(normalize("a\\b").is_err());
    }

    #[test]
    fn join_and_split() {
        assert_eq!(join("v1", "content/a.txt").unwrap(), "v1/content/a.txt");
        assert_eq!(join("", "x").unwrap(), "x");
        assert_eq!(parent("v1/content/a.txt"), "v1/content");
        assert_eq!(parent("a.txt"), "");
        assert_eq!(file_name("v1/content/a.txt"), "a.txt");
    }
}
