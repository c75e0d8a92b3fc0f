//! Foundation types for the OCFL storage engine.
//!
//! This crate provides the small value types shared by every other crate in
//! the workspace. Every other OCFL crate depends on `ocfl-types`.
//!
//! # Key Types
//!
//! - [`DigestAlgorithm`]: Named checksum algorithm (`sha512`, `sha256`, ...)
//! - [`Digest`]: Lowercase hex digest, the key of manifest and state maps
//! - [`VersionLabel`]: `v1`, `v2`, ... (optionally zero-padded)
//! - [`OcflVersion`]: Spec version driving declarations and type URIs
//! - [`User`]: Author recorded on every version
//! - [`ErrorKind`]: Classification shared by every error enum

pub mod digest;
pub mod error;
pub mod user;
pub mod version;

pub use digest::{Digest, DigestAlgorithm};
pub use error::{ErrorKind, TypeError};
pub use user::User;
pub use version::{OcflVersion, VersionLabel};
