//! OCFL storage root.
//!
//! A [`StorageRoot`] owns the root declaration, the storage layout that maps
//! object ids to directories, and the extension factory shared by every
//! object below it. It creates and loads objects, drives whole-folder
//! ingests and aggregates validation across the root.

pub mod cancel;
pub mod config;
pub mod error;
pub mod root;

pub use cancel::CancellationToken;
pub use config::{AddConfig, RootConfig};
pub use error::{RootError, RootResult};
pub use root::{IngestSummary, LayoutFile, StorageRoot, LAYOUT_FILE};

// Re-export key types
pub use ocfl_extension::{ExtensionFactory, ExtensionManager};
pub use ocfl_inventory::{Finding, ValidationCode, ValidationReport};
pub use ocfl_object::{Object, ObjectOptions};
