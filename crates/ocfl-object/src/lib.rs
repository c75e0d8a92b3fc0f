//! OCFL objects: the update transaction, content ingest and reading back.
//!
//! An [`Object`] wraps an inventory, the object's filesystem and its
//! extension manager. Updates go through `start_update`, any number of
//! adds and deletes, then `end_update`, which writes the version and the
//! new inventory.

pub mod error;
pub mod metadata;
pub mod object;
pub mod validate;

pub use error::{ObjectError, ObjectResult};
pub use metadata::{FileMetadata, ObjectMetadata, VersionMetadata};
pub use object::{object_declarations, FileOutcome, Object, ObjectOptions, UpdateStats, EXTENSIONS_DIR};
pub use validate::{finding_for_load_error, validate_object};

// Re-export key types
pub use ocfl_extension::DEFAULT_AREA;
pub use ocfl_inventory::{CommitSummary, ValidationReport};
