//! Core traits for the hddns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the host's public IP
//! - [`RecordSetProvider`]: Read and write record sets via a provider API

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{RecordKey, RecordSet, RecordSetProvider, RecordValue};
