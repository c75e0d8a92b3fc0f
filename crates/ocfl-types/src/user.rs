use serde::{Deserialize, Serialize};

/// The agent recorded on an inventory version.
///
/// Fields are declared in lexical order so the serialized form has a stable
/// key order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>, address: Option<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }

    /// Build a user from possibly-empty CLI style values.
    ///
    /// Returns `None` when the name is blank; a blank address is dropped.
    pub fn from_parts(name: &str, address: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let address = address.trim();
        Some(Self {
            address: (!address.is_empty()).then(|| address.to_string()),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_drops_blank_address() {
        let user = User::from_parts("Jane Doe", "  ").unwrap();
        assert_eq!(user.name, "Jane Doe");
        assert!(user.address.is_none());
    }

    #[test]
    fn from_parts_requires_name() {
        assert!(User::from_parts("", "mailto:jane@example.org").is_none());
    }

    #[test]
    fn serializes_address_before_name() {
        let user = User::new("Jane Doe", Some("mailto:jane@example.org".into()));
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(
            json,
            r#"{"address":"mailto:jane@example.org","name":"Jane Doe"}"#
        );
    }
}
