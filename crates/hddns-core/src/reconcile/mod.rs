//! Desired-state reconciliation for one zone
//!
//! The [`Reconciler`] compares the configured records of a zone with the
//! provider's live record sets and returns the mutations needed to
//! converge. It performs no I/O; the [`SyncEngine`](crate::engine::SyncEngine)
//! executes the operations it returns.
//!
//! ## Equality rule
//!
//! - One desired value and one existing value: compared directly.
//! - Any other shape: compared as unordered multisets (sorted lists).
//!
//! A record whose live values already match produces no operation, so a
//! converged zone is a fixed point.

use crate::config::{RecordConfig, RecordMode, ZoneConfig};
use crate::traits::{RecordKey, RecordSet, RecordValue};
use crate::txt::format_txt_value;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;

/// A mutation the engine must send to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOperation {
    /// Create a record set that does not exist yet
    Create {
        /// Zone name
        zone: String,
        /// Record name
        name: String,
        /// Record type
        record_type: String,
        /// Values to create
        records: Vec<RecordValue>,
        /// Effective TTL
        ttl: u32,
    },

    /// Replace the values of an existing record set
    Update {
        /// Zone name
        zone: String,
        /// Record name
        name: String,
        /// Record type
        record_type: String,
        /// New values
        records: Vec<RecordValue>,
        /// Effective TTL
        ttl: u32,
        /// Values the provider reported before the update
        previous: Vec<RecordValue>,
    },
}

impl ProviderOperation {
    /// Zone this operation targets
    pub fn zone(&self) -> &str {
        match self {
            Self::Create { zone, .. } | Self::Update { zone, .. } => zone,
        }
    }

    /// `(name, type)` key this operation targets
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Create {
                name, record_type, ..
            }
            | Self::Update {
                name, record_type, ..
            } => RecordKey::new(name, record_type),
        }
    }

    /// Values this operation writes
    pub fn records(&self) -> &[RecordValue] {
        match self {
            Self::Create { records, .. } | Self::Update { records, .. } => records,
        }
    }

    /// TTL this operation writes
    pub fn ttl(&self) -> u32 {
        match self {
            Self::Create { ttl, .. } | Self::Update { ttl, .. } => *ttl,
        }
    }

    /// Short verb for logs
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
        }
    }
}

/// Computes the operations that bring a zone to its desired state
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    /// TTL used when neither the record nor its zone sets one
    ttl_default: u32,
}

impl Reconciler {
    /// Create a reconciler with the global TTL fallback
    pub fn new(ttl_default: u32) -> Self {
        Self { ttl_default }
    }

    /// Diff a zone's desired records against its existing record sets
    ///
    /// # Parameters
    ///
    /// - `zone`: The zone and its configured records
    /// - `existing`: The provider's live record sets, keyed by `(name, type)`
    /// - `current_ip`: Value for `dynamic-ip` records
    ///
    /// # Returns
    ///
    /// The operations to execute, in the zone's record order. Records
    /// already converged produce nothing.
    pub fn reconcile(
        &self,
        zone: &ZoneConfig,
        existing: &HashMap<RecordKey, RecordSet>,
        current_ip: IpAddr,
    ) -> Vec<ProviderOperation> {
        zone.records
            .iter()
            .filter_map(|record| self.reconcile_record(zone, record, existing, current_ip))
            .collect()
    }

    fn reconcile_record(
        &self,
        zone: &ZoneConfig,
        record: &RecordConfig,
        existing: &HashMap<RecordKey, RecordSet>,
        current_ip: IpAddr,
    ) -> Option<ProviderOperation> {
        let desired = vec![RecordValue::new(desired_value(record, current_ip))];
        let ttl = self.effective_ttl(zone, record);
        let key = RecordKey::new(&record.name, &record.record_type);

        let Some(rrset) = existing.get(&key) else {
            return Some(ProviderOperation::Create {
                zone: zone.name.clone(),
                name: record.name.clone(),
                record_type: record.record_type.clone(),
                records: desired,
                ttl,
            });
        };

        if values_match(&rrset.records, &desired) {
            debug!("Record {} unchanged in zone {}", key, zone.name);
            return None;
        }

        Some(ProviderOperation::Update {
            zone: zone.name.clone(),
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            records: desired,
            ttl,
            previous: rrset.records.clone(),
        })
    }

    /// Record TTL, else zone TTL, else the global default
    fn effective_ttl(&self, zone: &ZoneConfig, record: &RecordConfig) -> u32 {
        record.ttl.or(zone.ttl).unwrap_or(self.ttl_default)
    }
}

/// Index a zone's record sets by `(name, type)`
///
/// Should the provider return the same key twice, the last one wins.
pub fn index_record_sets(record_sets: Vec<RecordSet>) -> HashMap<RecordKey, RecordSet> {
    record_sets
        .into_iter()
        .map(|rrset| (rrset.key(), rrset))
        .collect()
}

/// The value a record should carry right now
fn desired_value(record: &RecordConfig, current_ip: IpAddr) -> String {
    let value = match record.mode {
        RecordMode::DynamicIp => current_ip.to_string(),
        RecordMode::Static => record.value.clone().unwrap_or_default(),
    };

    if record.record_type == "TXT" {
        format_txt_value(&value)
    } else {
        value
    }
}

/// Compare existing and desired values under the single-value/multiset rule
fn values_match(existing: &[RecordValue], desired: &[RecordValue]) -> bool {
    if let ([current], [wanted]) = (existing, desired) {
        return current == wanted;
    }

    if existing.len() != desired.len() {
        return false;
    }

    let mut existing: Vec<&str> = existing.iter().map(|r| r.value.as_str()).collect();
    let mut desired: Vec<&str> = desired.iter().map(|r| r.value.as_str()).collect();
    existing.sort_unstable();
    desired.sort_unstable();
    existing == desired
}
