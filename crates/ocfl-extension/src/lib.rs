//! Extension system for OCFL storage roots and objects.
//!
//! Extensions are named, configurable units stored as
//! `extensions/<name>/config.json`. Each declares a fixed set of
//! [`Capability`] values; the [`ExtensionManager`] keeps one ordered handler
//! list per capability and dispatches hooks in that order.
//!
//! Constructors live in an explicit [`ExtensionFactory`] registry, built
//! once and shared by the storage root and every object it opens.

pub mod builtin;
pub mod capability;
pub mod error;
pub mod extension;
pub mod factory;
pub mod manager;

pub use capability::Capability;
pub use error::{ExtensionError, ExtensionResult};
pub use extension::{
    check_name, read_config, ChangeKind, ContentChange, Extension, ExtensionConfig, ObjectView,
    CONFIG_FILE,
};
pub use factory::{ExtensionCreator, ExtensionFactory};
pub use manager::{ExtensionManager, InitialConfig, DEFAULT_AREA, INITIAL_NAME};
