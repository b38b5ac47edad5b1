// # DNS Provider Trait
//
// Defines the interface for reading and writing record sets (RRSets) via a
// provider's zone API.
//
// ## Implementations
//
// - Hetzner Cloud DNS: `hddns-provider-hetzner` crate
//
// ## Usage
//
// ```rust,ignore
// use hddns_core::traits::{RecordSetProvider, RecordValue};
//
// #[tokio::main]
// async fn main() -> hddns_core::Result<()> {
//     let provider = /* RecordSetProvider implementation */;
//
//     let existing = provider.list_record_sets("example.com").await?;
//     provider
//         .set_record_values("example.com", "@", "A", &[RecordValue::new("203.0.113.7")], Some(300))
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single value inside a record set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordValue {
    /// Wire value (an address, a hostname, a quoted TXT string, ...)
    pub value: String,
}

impl RecordValue {
    /// Create a record value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// The provider's live state for one `(name, type)` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Label within the zone; "@" is the apex
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: String,
    /// Values, in the order the provider returned them
    #[serde(default)]
    pub records: Vec<RecordValue>,
    /// TTL, if the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl RecordSet {
    /// Lookup key of this record set
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, &self.record_type)
    }

    /// The plain values of this record set
    pub fn values(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.value.as_str()).collect()
    }
}

/// Identifies a record set within a zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    /// Label within the zone
    pub name: String,
    /// Record type
    pub record_type: String,
}

impl RecordKey {
    /// Create a key
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.record_type)
    }
}

/// Trait for DNS provider implementations
///
/// Providers expose three operations, each scoped by zone and, for the
/// mutating ones, by `(name, type)`. Deciding whether a mutation is needed
/// belongs to the [`Reconciler`](crate::reconcile::Reconciler).
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the next poll cycle is the retry)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff
/// - ❌ Cache record sets between calls
/// - ❌ Decide whether an update is needed
///
/// Every request must carry a bounded timeout.
#[async_trait]
pub trait RecordSetProvider: Send + Sync {
    /// Fetch all record sets of a zone
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RecordSet>)`: The zone's current record sets
    /// - `Err(Error)`: Network, authentication or HTTP failure
    async fn list_record_sets(&self, zone: &str) -> Result<Vec<RecordSet>, crate::Error>;

    /// Create a new record set
    ///
    /// Fails if the provider rejects it (duplicate, validation).
    async fn create_record_set(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        records: &[RecordValue],
        ttl: Option<u32>,
    ) -> Result<(), crate::Error>;

    /// Replace the full value list of an existing record set
    ///
    /// Must be idempotent: repeating the call with the same values leaves
    /// the record set unchanged.
    async fn set_record_values(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        records: &[RecordValue],
        ttl: Option<u32>,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_set_deserializes_provider_shape() {
        let json = r#"{"name": "www", "type": "A", "records": [{"value": "192.0.2.1", "comment": "x"}], "ttl": 300}"#;
        let rrset: RecordSet = serde_json::from_str(json).unwrap();

        assert_eq!(rrset.key(), RecordKey::new("www", "A"));
        assert_eq!(rrset.values(), vec!["192.0.2.1"]);
        assert_eq!(rrset.ttl, Some(300));
    }

    #[test]
    fn test_record_set_without_ttl() {
        let json = r#"{"name": "@", "type": "TXT", "records": []}"#;
        let rrset: RecordSet = serde_json::from_str(json).unwrap();
        assert_eq!(rrset.ttl, None);
        assert!(rrset.records.is_empty());
    }

    #[test]
    fn test_record_key_display() {
        assert_eq!(RecordKey::new("@", "AAAA").to_string(), "@ (AAAA)");
    }
}
