use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque reference to a stored blob (its storage location, e.g. `uploads/GarageImage-....jpg`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A persisted document owned by one collection of the record store
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table) name
    const COLLECTION: &'static str;

    /// Entity name used in error messages
    const ENTITY: &'static str;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    /// Fields whose values must be unique across the collection, as (field, value)
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Generate a record id: a one-letter prefix followed by a short random suffix
pub fn generate_id(prefix: char) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_prefix_and_length() {
        let id = generate_id('G');
        assert!(id.starts_with('G'));
        assert_eq!(id.len(), 13);
        assert_ne!(generate_id('G'), generate_id('G'));
    }

    #[test]
    fn test_blob_ref_serializes_as_plain_string() {
        let blob = BlobRef::new("uploads/a.png");
        assert_eq!(serde_json::to_string(&blob).unwrap(), "\"uploads/a.png\"");
        let parsed: BlobRef = serde_json::from_str("\"uploads/b.png\"").unwrap();
        assert_eq!(parsed.as_str(), "uploads/b.png");
        assert!(BlobRef::new("  ").is_empty());
    }
}
