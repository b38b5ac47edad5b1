//! Test doubles and common utilities for sync contract tests
//!
//! The mock provider keeps an in-memory copy of each zone's record sets and
//! applies create/set calls to it, so a second cycle sees the result of
//! the first one the way the real provider would.

#![allow(dead_code)]

use hddns_core::config::{DdnsConfig, GlobalConfig, RecordConfig, ZoneConfig};
use hddns_core::engine::EngineEvent;
use hddns_core::error::{Error, Result};
use hddns_core::traits::{IpSource, RecordSet, RecordSetProvider, RecordValue};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A provider call, as observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List {
        zone: String,
    },
    Create {
        zone: String,
        name: String,
        record_type: String,
        values: Vec<String>,
        ttl: Option<u32>,
    },
    Set {
        zone: String,
        name: String,
        record_type: String,
        values: Vec<String>,
        ttl: Option<u32>,
    },
}

impl ProviderCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, ProviderCall::List { .. })
    }
}

/// An in-memory RecordSetProvider that records every call
///
/// Clones share state, so a test can keep a handle after moving one into
/// the engine.
#[derive(Clone, Default)]
pub struct MockProvider {
    zones: Arc<Mutex<HashMap<String, Vec<RecordSet>>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    failing_zones: Arc<Mutex<HashSet<String>>>,
    failing_records: Arc<Mutex<HashSet<(String, String)>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone, optionally with existing record sets
    pub fn with_zone(self, zone: &str, record_sets: Vec<RecordSet>) -> Self {
        self.zones
            .lock()
            .unwrap()
            .insert(zone.to_string(), record_sets);
        self
    }

    /// Make `list_record_sets` fail for this zone
    pub fn failing_zone(self, zone: &str) -> Self {
        self.failing_zones.lock().unwrap().insert(zone.to_string());
        self
    }

    /// Make mutations of this `(name, type)` fail in every zone
    pub fn failing_record(self, name: &str, record_type: &str) -> Self {
        self.failing_records
            .lock()
            .unwrap()
            .insert((name.to_string(), record_type.to_string()));
        self
    }

    /// Delay every mutation (to observe in-flight cycles)
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(|c| c.is_mutation()).collect()
    }

    pub fn list_calls(&self, zone: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProviderCall::List { zone: z } if z == zone))
            .count()
    }

    /// Current values of a record set, if it exists
    pub fn values(&self, zone: &str, name: &str, record_type: &str) -> Option<Vec<String>> {
        let zones = self.zones.lock().unwrap();
        zones.get(zone)?.iter().find_map(|rrset| {
            (rrset.name == name && rrset.record_type == record_type)
                .then(|| rrset.values().into_iter().map(str::to_string).collect())
        })
    }

    fn check_record(&self, name: &str, record_type: &str) -> Result<()> {
        let failing = self.failing_records.lock().unwrap();
        if failing.contains(&(name.to_string(), record_type.to_string())) {
            return Err(Error::provider("mock", "invalid_input: rejected by provider"));
        }
        Ok(())
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl RecordSetProvider for MockProvider {
    async fn list_record_sets(&self, zone: &str) -> Result<Vec<RecordSet>> {
        self.calls.lock().unwrap().push(ProviderCall::List {
            zone: zone.to_string(),
        });

        if self.failing_zones.lock().unwrap().contains(zone) {
            return Err(Error::transient_provider("mock", "server error: 503"));
        }

        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone)))
    }

    async fn create_record_set(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        records: &[RecordValue],
        ttl: Option<u32>,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(ProviderCall::Create {
            zone: zone.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            values: records.iter().map(|r| r.value.clone()).collect(),
            ttl,
        });
        self.pause().await;
        self.check_record(name, record_type)?;

        let mut zones = self.zones.lock().unwrap();
        let record_sets = zones
            .get_mut(zone)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone)))?;
        if record_sets
            .iter()
            .any(|r| r.name == name && r.record_type == record_type)
        {
            return Err(Error::provider("mock", "uniqueness_error: record set exists"));
        }
        record_sets.push(RecordSet {
            name: name.to_string(),
            record_type: record_type.to_string(),
            records: records.to_vec(),
            ttl,
        });
        Ok(())
    }

    async fn set_record_values(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        records: &[RecordValue],
        ttl: Option<u32>,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(ProviderCall::Set {
            zone: zone.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            values: records.iter().map(|r| r.value.clone()).collect(),
            ttl,
        });
        self.pause().await;
        self.check_record(name, record_type)?;

        let mut zones = self.zones.lock().unwrap();
        let rrset = zones
            .get_mut(zone)
            .and_then(|sets| {
                sets.iter_mut()
                    .find(|r| r.name == name && r.record_type == record_type)
            })
            .ok_or_else(|| Error::not_found(format!("RRSet not found: {} ({})", name, record_type)))?;
        rrset.records = records.to_vec();
        rrset.ttl = ttl;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An IpSource answering from a scripted list, repeating the last answer
#[derive(Clone)]
pub struct ScriptedIpSource {
    answers: Arc<Mutex<Vec<Option<IpAddr>>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// Always answer with this IP
    pub fn fixed(ip: IpAddr) -> Self {
        Self::script(vec![Some(ip)])
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::script(vec![None])
    }

    /// Answer in order; `None` means a failed discovery
    pub fn script(answers: Vec<Option<IpAddr>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        let answers = self.answers.lock().unwrap();
        let answer = answers.get(call).or_else(|| answers.last()).copied().flatten();
        answer.ok_or_else(|| Error::ip_source("connection refused"))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn rrset(name: &str, record_type: &str, values: &[&str]) -> RecordSet {
    RecordSet {
        name: name.to_string(),
        record_type: record_type.to_string(),
        records: values.iter().map(|v| RecordValue::new(*v)).collect(),
        ttl: Some(300),
    }
}

/// A valid configuration with the given zones
pub fn config_with(zones: Vec<ZoneConfig>) -> DdnsConfig {
    DdnsConfig {
        global: GlobalConfig {
            api_token: "test-token".to_string(),
            check_interval_seconds: 300,
            ttl_default: 300,
            ip_check_url: "http://127.0.0.1/ip".to_string(),
        },
        zones,
    }
}

/// One zone with a dynamic apex A record and a static TXT record
pub fn minimal_config(zone: &str) -> DdnsConfig {
    config_with(vec![
        ZoneConfig::new(zone)
            .with_record(RecordConfig::new_dynamic("@", "A"))
            .with_record(RecordConfig::new_static("_dmarc", "TXT", "v=DMARC1; p=none")),
    ])
}

/// Wait for the next event matching `pred`, failing after 5 seconds
pub async fn wait_for_event<F>(rx: &mut mpsc::Receiver<EngineEvent>, pred: F) -> EngineEvent
where
    F: Fn(&EngineEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event arrives within 5 seconds")
}

/// Drain events that are already queued
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
