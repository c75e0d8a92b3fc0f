//! The OCFL inventory: manifest, versions and the open draft version.
//!
//! An [`Inventory`] is append-only. Content enters the manifest once per
//! digest; each committed [`Version`] maps digests to the logical paths
//! visible in that version. Updates build a [`DraftVersion`] beside the
//! committed versions and only a successful [`Inventory::commit`] promotes
//! it, writing `inventory.json` and its digest sidecar.
//!
//! Structural problems are reported as [`Finding`]s carrying stable OCFL
//! validation codes rather than as errors, so one broken object never stops
//! a validation run.

pub mod digest_map;
pub mod error;
pub mod inventory;
pub mod io;
pub mod validation;
pub mod version;

pub use digest_map::DigestMap;
pub use error::{InventoryError, InventoryResult};
pub use inventory::{AddOutcome, CommitSummary, Inventory, DEFAULT_CONTENT_DIRECTORY};
pub use io::{read_inventory, read_verified, sidecar_name, write_inventory, INVENTORY_FILE};
pub use validation::{Finding, Severity, ValidationCode, ValidationReport};
pub use version::{DraftVersion, Version};
