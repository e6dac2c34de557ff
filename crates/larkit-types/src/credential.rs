//! Credential sets used to request access tokens.
//!
//! A `CredentialSet` is an ordered list of named secrets (app id, secret,
//! grant type, ...). Its canonical JSON form is both the request payload
//! handed to the issuer and the input to the cache fingerprint, so entry
//! order is preserved exactly as constructed.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered, immutable mapping of credential names to values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    entries: Vec<(String, String)>,
}

impl CredentialSet {
    /// Build a credential set from ordered `(name, value)` pairs.
    ///
    /// A repeated name keeps its first position and takes the last value.
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut out: Vec<(String, String)> = Vec::new();
        for (k, v) in entries {
            let (k, v) = (k.into(), v.into());
            match out.iter_mut().find(|(name, _)| *name == k) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Self { entries: out }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in construction order, e.g. for a query string.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Canonical serialization: a JSON object with keys in construction order.
    pub fn canonical_json(&self) -> String {
        // Serializing string pairs into a String cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, _) in &self.entries {
            map.entry(k, &"[REDACTED]");
        }
        map.finish()
    }
}

impl Serialize for CredentialSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CredentialSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CredentialVisitor;

        impl<'de> Visitor<'de> for CredentialVisitor {
            type Value = CredentialSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of credential names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    entries.push((k, v));
                }
                Ok(CredentialSet::new(entries))
            }
        }

        deserializer.deserialize_map(CredentialVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_preserves_order() {
        let creds = CredentialSet::new([
            ("grant_type", "client_credential"),
            ("appid", "wx123"),
            ("secret", "s3cr3t"),
        ]);
        assert_eq!(
            creds.canonical_json(),
            r#"{"grant_type":"client_credential","appid":"wx123","secret":"s3cr3t"}"#
        );
    }

    #[test]
    fn test_repeated_name_keeps_position_takes_last_value() {
        let creds = CredentialSet::new([("appid", "a"), ("secret", "b"), ("appid", "c")]);
        assert_eq!(creds.len(), 2);
        assert_eq!(creds.pairs()[0], ("appid".to_string(), "c".to_string()));
    }

    #[test]
    fn test_debug_redacts_values() {
        let creds = CredentialSet::new([("secret", "super-secret-value")]);
        let debug = format!("{creds:?}");
        assert!(debug.contains("secret"));
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        let creds: CredentialSet = toml::from_str(
            r#"
appid = "wx123"
secret = "abc"
"#,
        )
        .unwrap();
        assert_eq!(creds.get("appid"), Some("wx123"));
        assert_eq!(creds.get("secret"), Some("abc"));
        assert_eq!(creds.get("missing"), None);
    }
}
