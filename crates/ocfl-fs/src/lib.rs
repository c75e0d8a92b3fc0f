//! Filesystem capability layer for OCFL storage.
//!
//! The engine never touches `std::fs` directly. Storage roots, objects and
//! extensions read and write through [`ReadFs`] / [`WriteFs`] trait objects,
//! so the same code runs against local disk, memory, or any backend that
//! implements the two traits.
//!
//! # Backends
//!
//! - [`MemoryFs`]: in-process tree for tests and embedding
//! - [`LocalFs`]: local disk, atomic replace via temp file and rename
//! - [`SubFs`]: sub-tree view of another backend
//! - [`ReadOnlyFs`]: rejects every mutation
//!
//! [`FsFactory`] picks a backend per location by pattern and tier.

pub mod error;
pub mod factory;
pub mod local;
pub mod memory;
pub mod path;
pub mod sub;
pub mod traits;

pub use error::{FsError, FsResult};
pub use factory::{BackendTier, FsFactory, PathPattern};
pub use local::LocalFs;
pub use memory::MemoryFs;
pub use sub::{sub_read, sub_write, ReadOnlyFs, SubFs};
pub use traits::{DirEntry, FileInfo, ReadFs, WriteFs};
