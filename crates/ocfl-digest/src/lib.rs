//! Streaming digests for OCFL content.
//!
//! A single pass over the bytes of a file feeds every requested algorithm:
//! the inventory's primary algorithm plus any fixity algorithms. Hashing
//! wraps the established `sha2`, `sha1`, `md5` and `blake3` crates.

pub mod digester;
pub mod error;

pub use digester::{copy_with_digests, digest_bytes, digest_reader, verify_reader, DigestSet, Digester};
pub use error::{DigestError, DigestResult};
