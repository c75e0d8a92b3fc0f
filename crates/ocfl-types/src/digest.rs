use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Checksum algorithm used for content addressing or fixity.
///
/// Variants are declared in lexical order of their names so that maps keyed
/// by algorithm serialize in the same order as a string-keyed map would.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DigestAlgorithm {
    Blake3,
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// All supported algorithms.
    pub const ALL: [DigestAlgorithm; 5] = [
        Self::Blake3,
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
    ];

    /// The registered algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex encoded digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Blake3 | Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Only `sha512` and `sha256` may address content in an inventory.
    pub fn is_content_algorithm(&self) -> bool {
        matches!(self, Self::Sha512 | Self::Sha256)
    }
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        Self::Sha512
    }
}

impl fmt::Debug for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == name)
            .ok_or_else(|| TypeError::UnknownAlgorithm(s.to_string()))
    }
}

impl Serialize for DigestAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DigestAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Hex encoded digest value.
///
/// Digests are normalized to lowercase on construction, so two digests of the
/// same bytes always compare equal regardless of how they were written.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Parse a hex string, normalizing to lowercase.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidDigest(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Build a digest from raw hash output.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_hex(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }

    /// Whether the length matches what `algorithm` produces.
    pub fn matches_algorithm(&self, algorithm: DigestAlgorithm) -> bool {
        self.0.len() == algorithm.hex_len()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn algorithm_parse_is_case_insensitive() {
        assert_eq!("SHA512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert_eq!(" md5 ".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn only_sha2_family_addresses_content() {
        assert!(DigestAlgorithm::Sha512.is_content_algorithm());
        assert!(DigestAlgorithm::Sha256.is_content_algorithm());
        assert!(!DigestAlgorithm::Md5.is_content_algorithm());
        assert!(!DigestAlgorithm::Blake3.is_content_algorithm());
    }

    #[test]
    fn algorithm_map_keys_serialize_lexically() {
        let mut map = BTreeMap::new();
        map.insert(DigestAlgorithm::Sha512, 1);
        map.insert(DigestAlgorithm::Md5, 2);
        map.insert(DigestAlgorithm::Sha1, 3);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"md5":2,"sha1":3,"sha512":1}"#);
        let back: BTreeMap<DigestAlgorithm, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn digest_is_normalized_to_lowercase() {
        let upper = Digest::from_hex("ABCDEF").unwrap();
        let lower = Digest::from_hex("abcdef").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "abcdef");
    }

    #[test]
    fn digest_rejects_non_hex() {
        assert!(Digest::from_hex("xyz").is_err());
        assert!(Digest::from_hex("").is_err());
    }

    #[test]
    fn digest_length_matches_algorithm() {
        let d = Digest::from_hex("900150983cd24fb0d6963f7d28e17f72").unwrap();
        assert!(d.matches_algorithm(DigestAlgorithm::Md5));
        assert!(!d.matches_algorithm(DigestAlgorithm::Sha512));
    }

    #[test]
    fn digest_from_bytes_encodes_hex() {
        assert_eq!(Digest::from_bytes(&[0xde, 0xad]).as_str(), "dead");
    }
}
