use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Label of an object version: `v1`, `v2`, ... or zero-padded `v001`.
///
/// Labels order by their number, never lexically, so `v10` sorts after `v9`.
/// The padding width of the first label is carried forward by [`next`].
///
/// [`next`]: VersionLabel::next
#[derive(Clone, Copy)]
pub struct VersionLabel {
    number: u32,
    /// Total digit count for padded labels, `0` when unpadded.
    padding: usize,
}

impl VersionLabel {
    /// The first version of an object, `v1`.
    pub const fn first() -> Self {
        Self {
            number: 1,
            padding: 0,
        }
    }

    /// First version using `width` zero-padded digits (`v001` for 3).
    pub fn first_padded(width: usize) -> Self {
        Self {
            number: 1,
            padding: if width > 1 { width } else { 0 },
        }
    }

    pub fn new(number: u32) -> Result<Self, TypeError> {
        if number == 0 {
            return Err(TypeError::InvalidVersionLabel("v0".into()));
        }
        Ok(Self { number, padding: 0 })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn is_padded(&self) -> bool {
        self.padding > 0
    }

    /// Number of digits in the unpadded number.
    pub fn digit_count(&self) -> usize {
        self.number.to_string().len()
    }

    /// The same version written with `width` zero-padded digits, or unpadded
    /// for a width of 0 or 1.
    pub fn with_padding(self, width: usize) -> Self {
        Self {
            number: self.number,
            padding: if width > 1 { width } else { 0 },
        }
    }

    /// Whether this label, as written, belongs to a sequence padded to
    /// `width` digits.
    ///
    /// A label without leading zeros fits a padded sequence only when its
    /// digits fill the width exactly: `v10` fits width 2, `v9` does not.
    pub fn fits_width(&self, width: usize) -> bool {
        if width <= 1 {
            return self.padding == 0;
        }
        self.padding == width || (self.padding == 0 && self.digit_count() == width)
    }

    /// The following label, keeping the padding width.
    ///
    /// Padded labels cannot grow past their width: `v999` has no successor
    /// when padded to three digits.
    pub fn next(&self) -> Result<Self, TypeError> {
        let number = self
            .number
            .checked_add(1)
            .ok_or_else(|| TypeError::VersionOverflow {
                label: self.to_string(),
                width: self.padding,
            })?;
        if self.padding > 0 && number.to_string().len() > self.padding {
            return Err(TypeError::VersionOverflow {
                label: self.to_string(),
                width: self.padding,
            });
        }
        Ok(Self {
            number,
            padding: self.padding,
        })
    }

    /// The preceding label, or `None` for the first version.
    pub fn previous(&self) -> Option<Self> {
        (self.number > 1).then(|| Self {
            number: self.number - 1,
            padding: self.padding,
        })
    }

    /// Parse a label, accepting `v1` or zero-padded `v0001`.
    ///
    /// A single label only shows its padding through leading zeros, so
    /// `v10` parses as unpadded. Sequences restore the width with
    /// [`with_padding`](Self::with_padding).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let digits = s
            .strip_prefix('v')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| TypeError::InvalidVersionLabel(s.to_string()))?;
        let number: u32 = digits
            .parse()
            .map_err(|_| TypeError::InvalidVersionLabel(s.to_string()))?;
        if number == 0 {
            return Err(TypeError::InvalidVersionLabel(s.to_string()));
        }
        let padding = if digits.starts_with('0') { digits.len() } else { 0 };
        Ok(Self { number, padding })
    }
}

impl Default for VersionLabel {
    fn default() -> Self {
        Self::first()
    }
}

impl PartialEq for VersionLabel {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for VersionLabel {}

impl Hash for VersionLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for VersionLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Debug for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:0width$}", self.number, width = self.padding)
    }
}

impl FromStr for VersionLabel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// OCFL specification version a root or object conforms to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OcflVersion {
    V1_0,
    #[default]
    V1_1,
}

impl OcflVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
        }
    }

    /// Value of the inventory `type` field.
    pub fn inventory_type(&self) -> String {
        format!("https://ocfl.io/{}/spec/#inventory", self.as_str())
    }

    /// Recover the version from an inventory `type` URI.
    pub fn from_inventory_type(uri: &str) -> Result<Self, TypeError> {
        uri.strip_prefix("https://ocfl.io/")
            .and_then(|rest| rest.strip_suffix("/spec/#inventory"))
            .ok_or_else(|| TypeError::UnsupportedOcflVersion(uri.to_string()))?
            .parse()
    }

    /// NAMASTE declaration file name of an object, `0=ocfl_object_1.1`.
    pub fn object_declaration(&self) -> String {
        format!("0={}", self.object_conformance())
    }

    /// Content of the object declaration file.
    pub fn object_declaration_content(&self) -> String {
        format!("{}\n", self.object_conformance())
    }

    /// NAMASTE declaration file name of a storage root, `0=ocfl_1.1`.
    pub fn root_declaration(&self) -> String {
        format!("0={}", self.root_conformance())
    }

    pub fn root_declaration_content(&self) -> String {
        format!("{}\n", self.root_conformance())
    }

    /// Name of the specification text a root may carry, `ocfl_1.1.md`.
    pub fn documentation_name(&self) -> String {
        format!("{}.md", self.root_conformance())
    }

    fn object_conformance(&self) -> String {
        format!("ocfl_object_{}", self.as_str())
    }

    fn root_conformance(&self) -> String {
        format!("ocfl_{}", self.as_str())
    }
}

impl fmt::Display for OcflVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcflVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            other => Err(TypeError::UnsupportedOcflVersion(other.to_string())),
        }
    }
}

impl Serialize for OcflVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OcflVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_plain_and_padded() {
        let plain = VersionLabel::parse("v12").unwrap();
        assert_eq!(plain.number(), 12);
        assert!(!plain.is_padded());

        let padded = VersionLabel::parse("v007").unwrap();
        assert_eq!(padded.number(), 7);
        assert_eq!(padded.padding(), 3);
        assert_eq!(padded.to_string(), "v007");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "v", "1", "v0", "v-1", "V1", "v1a", "v000"] {
            assert!(VersionLabel::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn next_keeps_padding() {
        let v = VersionLabel::parse("v009").unwrap();
        assert_eq!(v.next().unwrap().to_string(), "v010");
        assert_eq!(VersionLabel::first().next().unwrap().to_string(), "v2");
    }

    #[test]
    fn padded_overflow_is_an_error() {
        let v = VersionLabel::parse("v0999").unwrap();
        assert_eq!(v.next().unwrap().to_string(), "v1000");
        let v = VersionLabel::new(999).unwrap().with_padding(3);
        assert_eq!(v.to_string(), "v999");
        assert!(matches!(v.next(), Err(TypeError::VersionOverflow { .. })));
        // unpadded labels grow freely
        assert_eq!(VersionLabel::parse("v999").unwrap().next().unwrap().to_string(), "v1000");
    }

    #[test]
    fn width_of_labels_without_leading_zeros() {
        let v10 = VersionLabel::parse("v10").unwrap();
        assert!(!v10.is_padded());
        assert!(v10.fits_width(2));
        assert!(v10.fits_width(0));
        assert!(!v10.fits_width(3));
        assert!(!VersionLabel::parse("v9").unwrap().fits_width(2));
        assert!(!VersionLabel::parse("v09").unwrap().fits_width(0));

        let padded = v10.with_padding(2);
        assert_eq!(padded.to_string(), "v10");
        assert!(matches!(
            VersionLabel::new(99).unwrap().with_padding(2).next(),
            Err(TypeError::VersionOverflow { .. })
        ));
        assert!(!VersionLabel::new(3).unwrap().with_padding(1).is_padded());
    }

    #[test]
    fn previous_of_first_is_none() {
        assert!(VersionLabel::first().previous().is_none());
        assert_eq!(VersionLabel::new(3).unwrap().previous().unwrap().number(), 2);
    }

    #[test]
    fn labels_as_map_keys_order_numerically() {
        let mut versions = BTreeMap::new();
        for n in [10, 2, 1, 9] {
            versions.insert(VersionLabel::new(n).unwrap(), n);
        }
        let json = serde_json::to_string(&versions).unwrap();
        assert_eq!(json, r#"{"v1":1,"v2":2,"v9":9,"v10":10}"#);
    }

    #[test]
    fn ocfl_version_names() {
        let v = OcflVersion::V1_1;
        assert_eq!(v.object_declaration(), "0=ocfl_object_1.1");
        assert_eq!(v.object_declaration_content(), "ocfl_object_1.1\n");
        assert_eq!(v.root_declaration(), "0=ocfl_1.1");
        assert_eq!(v.documentation_name(), "ocfl_1.1.md");
        assert_eq!(v.inventory_type(), "https://ocfl.io/1.1/spec/#inventory");
    }

    #[test]
    fn ocfl_version_from_type_uri() {
        let v = OcflVersion::from_inventory_type("https://ocfl.io/1.0/spec/#inventory").unwrap();
        assert_eq!(v, OcflVersion::V1_0);
        assert!(OcflVersion::from_inventory_type("https://example.org/").is_err());
        assert!("2.0".parse::<OcflVersion>().is_err());
    }

    proptest! {
        #[test]
        fn label_order_follows_number(a in 1u32..100_000, b in 1u32..100_000) {
            let la = VersionLabel::new(a).unwrap();
            let lb = VersionLabel::new(b).unwrap();
            prop_assert_eq!(la.cmp(&lb), a.cmp(&b));
        }

        #[test]
        fn label_display_parses_back(n in 1u32..1_000_000) {
            let label = VersionLabel::new(n).unwrap();
            let parsed = VersionLabel::parse(&label.to_string()).unwrap();
            prop_assert_eq!(parsed.number(), n);
        }
    }
}
