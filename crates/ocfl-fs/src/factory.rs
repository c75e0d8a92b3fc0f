use std::sync::Arc;

use tracing::debug;

use crate::error::{FsError, FsResult};
use crate::local::LocalFs;
use crate::sub::ReadOnlyFs;
use crate::traits::{ReadFs, WriteFs};

/// Which locations a backend accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathPattern {
    Any,
    /// Location ends with the given text, e.g. `.zip`.
    Suffix(String),
    /// Location starts with the given text, e.g. `s3://`.
    Prefix(String),
}

impl PathPattern {
    pub fn matches(&self, location: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Suffix(s) => location.ends_with(s.as_str()),
            Self::Prefix(p) => location.starts_with(p.as_str()),
        }
    }
}

/// Priority of a backend when several patterns match.
///
/// Archive containers register at `High`, remote object stores at `Medium`
/// and plain disk at `Low`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendTier {
    Low,
    Medium,
    High,
}

type Opener = Box<dyn Fn(&str) -> FsResult<Arc<dyn WriteFs>> + Send + Sync>;

struct Backend {
    name: String,
    pattern: PathPattern,
    tier: BackendTier,
    open: Opener,
}

/// Selects a filesystem backend per location.
///
/// Lookup picks the highest tier whose pattern matches; among equal tiers the
/// earliest registration wins. Without a match the factory falls back to
/// [`LocalFs`] unless the fallback has been disabled.
pub struct FsFactory {
    backends: Vec<Backend>,
    local_fallback: bool,
}

impl FsFactory {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            local_fallback: true,
        }
    }

    /// Factory that fails for locations no registered backend accepts.
    pub fn without_fallback() -> Self {
        Self {
            backends: Vec::new(),
            local_fallback: false,
        }
    }

    pub fn register<O>(&mut self, name: &str, pattern: PathPattern, tier: BackendTier, open: O)
    where
        O: Fn(&str) -> FsResult<Arc<dyn WriteFs>> + Send + Sync + 'static,
    {
        self.backends.push(Backend {
            name: name.to_string(),
            pattern,
            tier,
            open: Box::new(open),
        });
    }

    /// Names of registered backends, in registration order.
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name.as_str()).collect()
    }

    /// Open `location` for reading and writing.
    pub fn open_write(&self, location: &str) -> FsResult<Arc<dyn WriteFs>> {
        let mut best: Option<&Backend> = None;
        for backend in self.backends.iter().filter(|b| b.pattern.matches(location)) {
            if best.map_or(true, |b| backend.tier > b.tier) {
                best = Some(backend);
            }
        }
        match best {
            Some(backend) => {
                debug!(location, backend = %backend.name, "selected filesystem backend");
                (backend.open)(location)
            }
            None if self.local_fallback => {
                debug!(location, "falling back to local filesystem");
                Ok(Arc::new(LocalFs::new(location)))
            }
            None => Err(FsError::NoBackend(location.to_string())),
        }
    }

    /// Open `location` for reading only.
    pub fn open_read(&self, location: &str) -> FsResult<Arc<dyn ReadFs>> {
        let fs = self.open_write(location)?;
        Ok(Arc::new(ReadOnlyFs::new(fs)))
    }
}

impl Default for FsFactory {
    fn default() -> Self {
        Self::new()
    }
}
