//! Sync orchestrator and poll loop
//!
//! The SyncEngine is responsible for:
//! - Discovering the public IP once per cycle via IpSource
//! - Fetching each zone's record sets via RecordSetProvider
//! - Running the Reconciler per zone
//! - Executing the resulting create/update operations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  IpSource   │─── current IP ──────┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  SyncEngine  │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐         ┌───────────────────┐          ┌─────────────┐
//! │ Reconciler  │         │ RecordSetProvider │          │   Events    │
//! │ (diff)      │         │ (list/create/set) │          │  (notify)   │
//! └─────────────┘         └───────────────────┘          └─────────────┘
//! ```
//!
//! ## Failure Isolation
//!
//! - IP discovery fails → the whole cycle is skipped
//! - Listing a zone fails → that zone is skipped, the others proceed
//! - A create/update fails → that record is skipped, the others proceed
//!
//! Nothing is retried within a cycle; the next cycle re-diffs from fresh
//! provider state.

use crate::config::{ConfigWatcher, DdnsConfig, ZoneConfig};
use crate::error::{Error, Result};
use crate::reconcile::{ProviderOperation, Reconciler, index_record_sets};
use crate::traits::{IpSource, RecordKey, RecordSetProvider, RecordValue};
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Poll loop started
    Started {
        zones_count: usize,
        records_count: usize,
    },

    /// A cycle began with this public IP
    CycleStarted { ip: IpAddr },

    /// A missing record set was created
    RecordCreated {
        zone: String,
        key: RecordKey,
        values: Vec<String>,
    },

    /// An existing record set had its values replaced
    RecordUpdated {
        zone: String,
        key: RecordKey,
        previous: Vec<String>,
        values: Vec<String>,
    },

    /// A record set already matched
    RecordUnchanged { zone: String, key: RecordKey },

    /// A create/update call failed; the record is retried next cycle
    RecordFailed {
        zone: String,
        key: RecordKey,
        error: String,
    },

    /// Fetching a zone's record sets failed; the zone is retried next cycle
    ZoneSkipped { zone: String, error: String },

    /// The whole cycle was skipped
    CycleSkipped { reason: String },

    /// A cycle finished
    CycleCompleted { report: SyncReport },

    /// A changed configuration file was applied
    ConfigReloaded { summary: String },

    /// Poll loop stopped
    Stopped { reason: String },
}

/// Outcome counts of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Zones whose record sets were fetched
    pub zones_synced: usize,
    /// Zones skipped because their record sets could not be fetched
    pub zones_failed: usize,
    /// Record sets created
    pub created: usize,
    /// Record sets updated
    pub updated: usize,
    /// Records already converged
    pub unchanged: usize,
    /// Records whose mutation failed
    pub failed: usize,
}

impl SyncReport {
    /// True when every zone and record was processed without error
    pub fn is_clean(&self) -> bool {
        self.zones_failed == 0 && self.failed == 0
    }

    /// Number of successful mutations
    pub fn mutations(&self) -> usize {
        self.created + self.updated
    }
}

/// Sync orchestrator
///
/// Processes zones one at a time and records one at a time; there is no
/// parallel fan-out. A cycle in flight always runs to completion.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Optionally attach a [`ConfigWatcher`] for hot reload
/// 3. Run with [`SyncEngine::run()`] until the token is cancelled
pub struct SyncEngine {
    /// DNS provider for reading and writing record sets
    provider: Box<dyn RecordSetProvider>,

    /// Public IP source
    ip_source: Box<dyn IpSource>,

    /// Configuration in force for the next cycle
    config: DdnsConfig,

    /// Optional watcher reloading the configuration between cycles
    watcher: Option<ConfigWatcher>,

    /// IP seen by the previous successful discovery
    last_ip: Option<IpAddr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `ip_source`: Public IP source implementation
    /// - `config`: Validated hddns configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        provider: Box<dyn RecordSetProvider>,
        ip_source: Box<dyn IpSource>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            provider,
            ip_source,
            config,
            watcher: None,
            last_ip: None,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Reload the configuration from this watcher between cycles
    pub fn with_config_watcher(mut self, watcher: ConfigWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Configuration in force
    pub fn config(&self) -> &DdnsConfig {
        &self.config
    }

    /// Run the poll loop until `shutdown` is cancelled
    ///
    /// The token is checked before each cycle and raced against the
    /// inter-cycle sleep, so shutdown latency is bounded by the duration
    /// of the cycle in flight.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            zones_count: self.config.zones.len(),
            records_count: self.config.zones.iter().map(|z| z.records.len()).sum(),
        });
        info!(
            "Starting sync loop via {} (interval: {}s)",
            self.provider.provider_name(),
            self.config.global.check_interval_seconds
        );

        while !shutdown.is_cancelled() {
            self.reload_config();

            match self.run_cycle().await {
                Ok(report) => info!(
                    "Sync cycle completed ({} created, {} updated, {} unchanged, {} failed, {} zone(s) skipped), sleeping for {} seconds",
                    report.created,
                    report.updated,
                    report.unchanged,
                    report.failed,
                    report.zones_failed,
                    self.config.global.check_interval_seconds
                ),
                Err(e) => error!("Error during sync cycle: {}", e),
            }

            let interval = Duration::from_secs(self.config.global.check_interval_seconds);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Shutdown requested, sync loop stopped");
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        Ok(())
    }

    /// Run one full cycle: discover the IP, then sync every zone
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: The cycle ran (zone/record failures are counted, not returned)
    /// - `Err(Error::IpSource)`: The public IP could not be determined; nothing was synced
    pub async fn run_cycle(&mut self) -> Result<SyncReport> {
        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                let error = Error::ip_source(format!(
                    "Failed to get public IP from {}: {}",
                    self.ip_source.source_name(),
                    e
                ));
                self.emit_event(EngineEvent::CycleSkipped {
                    reason: error.to_string(),
                });
                return Err(error);
            }
        };

        match self.last_ip {
            Some(previous) if previous != ip => info!("IP changed: {} -> {}", previous, ip),
            Some(_) => debug!("Current IP: {}", ip),
            None => info!("Current IP: {}", ip),
        }
        self.last_ip = Some(ip);

        self.emit_event(EngineEvent::CycleStarted { ip });
        let report = self.sync_all(&self.config.zones, ip).await;
        self.emit_event(EngineEvent::CycleCompleted {
            report: report.clone(),
        });

        Ok(report)
    }

    /// Synchronize every zone against the provider
    ///
    /// Zones are independent: a zone whose record sets cannot be fetched is
    /// logged and skipped. Within a zone, a failed mutation skips only that
    /// record.
    pub async fn sync_all(&self, zones: &[ZoneConfig], ip: IpAddr) -> SyncReport {
        let reconciler = Reconciler::new(self.config.global.ttl_default);
        let mut report = SyncReport::default();

        for zone in zones {
            info!("Processing zone: {}", zone.name);

            let existing = match self.provider.list_record_sets(&zone.name).await {
                Ok(record_sets) => index_record_sets(record_sets),
                Err(e) => {
                    let error = Error::zone_lookup(&zone.name, e.to_string());
                    log_failure(&error, e.is_transient());
                    report.zones_failed += 1;
                    self.emit_event(EngineEvent::ZoneSkipped {
                        zone: zone.name.clone(),
                        error: error.to_string(),
                    });
                    continue;
                }
            };
            report.zones_synced += 1;

            let operations = reconciler.reconcile(zone, &existing, ip);
            let pending: HashSet<RecordKey> = operations.iter().map(|op| op.key()).collect();

            for record in &zone.records {
                let key = RecordKey::new(&record.name, &record.record_type);
                if !pending.contains(&key) {
                    report.unchanged += 1;
                    self.emit_event(EngineEvent::RecordUnchanged {
                        zone: zone.name.clone(),
                        key,
                    });
                }
            }

            for operation in operations {
                match self.apply(&operation).await {
                    Ok(()) => self.record_success(&operation, &mut report),
                    Err(e) => {
                        let key = operation.key();
                        let error =
                            Error::mutation(operation.zone(), key.name, key.record_type, e.to_string());
                        log_failure(&error, e.is_transient());
                        report.failed += 1;
                        self.emit_event(EngineEvent::RecordFailed {
                            zone: operation.zone().to_string(),
                            key: operation.key(),
                            error: error.to_string(),
                        });
                    }
                }
            }
        }

        report
    }

    /// Execute one operation against the provider
    async fn apply(&self, operation: &ProviderOperation) -> Result<()> {
        match operation {
            ProviderOperation::Create {
                zone,
                name,
                record_type,
                records,
                ttl,
            } => {
                self.provider
                    .create_record_set(zone, name, record_type, records, Some(*ttl))
                    .await
            }
            ProviderOperation::Update {
                zone,
                name,
                record_type,
                records,
                ttl,
                ..
            } => {
                self.provider
                    .set_record_values(zone, name, record_type, records, Some(*ttl))
                    .await
            }
        }
    }

    fn record_success(&self, operation: &ProviderOperation, report: &mut SyncReport) {
        let zone = operation.zone().to_string();
        let key = operation.key();

        match operation {
            ProviderOperation::Create { records, .. } => {
                info!("Created {} in zone {}: {:?}", key, zone, plain(records));
                report.created += 1;
                self.emit_event(EngineEvent::RecordCreated {
                    zone,
                    key,
                    values: plain(records),
                });
            }
            ProviderOperation::Update {
                records, previous, ..
            } => {
                info!(
                    "Updated {} in zone {}: {:?} -> {:?}",
                    key,
                    zone,
                    plain(previous),
                    plain(records)
                );
                report.updated += 1;
                self.emit_event(EngineEvent::RecordUpdated {
                    zone,
                    key,
                    previous: plain(previous),
                    values: plain(records),
                });
            }
        }
    }

    /// Apply a changed configuration file, if a watcher is attached
    fn reload_config(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let polled = watcher.poll();
        let path = watcher.path().display().to_string();

        match polled {
            Ok(Some(mut config)) => {
                if config.global.api_token != self.config.global.api_token
                    || config.global.ip_check_url != self.config.global.ip_check_url
                {
                    warn!("api_token/ip_check_url changes take effect after a restart");
                    config.global.api_token = self.config.global.api_token.clone();
                    config.global.ip_check_url = self.config.global.ip_check_url.clone();
                }

                let summary = config.summary();
                info!(
                    "Configuration reloaded: {}, interval: {}s",
                    summary, config.global.check_interval_seconds
                );
                self.config = config;
                self.emit_event(EngineEvent::ConfigReloaded { summary });
            }
            Ok(None) => {}
            Err(e) => error!(
                "Failed to reload config from {}: {} (keeping previous config)",
                path, e
            ),
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event");
        }
    }
}

fn plain(records: &[RecordValue]) -> Vec<String> {
    records.iter().map(|r| r.value.clone()).collect()
}

fn log_failure(error: &Error, transient: bool) {
    if transient {
        warn!("{} (will retry next cycle)", error);
    } else {
        error!("{}", error);
    }
}
