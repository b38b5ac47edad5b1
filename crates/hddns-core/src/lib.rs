// # hddns-core
//
// Core library keeping DNS records on Hetzner Cloud DNS in sync with the
// host's public IP and a declarative set of static records.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering the current public IP
// - **RecordSetProvider**: Trait for listing, creating and replacing record sets
// - **Reconciler**: Pure diff of desired records against live record sets
// - **txt**: DNS-style chunked quoting of long TXT values
// - **SyncEngine**: Orchestrates zones and records, runs the poll loop
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation logic is separate from provider I/O
// 2. **Fresh State**: Live record sets are fetched every cycle, never cached
// 3. **Failure Isolation**: A bad zone or record never aborts the rest of a cycle
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod txt;
pub mod reconcile;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, RecordKey, RecordSet, RecordSetProvider, RecordValue};
pub use reconcile::{ProviderOperation, Reconciler};
pub use engine::{EngineEvent, SyncEngine, SyncReport};
pub use config::{ConfigWatcher, DdnsConfig, RecordConfig, RecordMode, ZoneConfig, load_config};
pub use error::{Error, Result};
