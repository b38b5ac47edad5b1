//! Error types for the hddns system
//!
//! The orchestrator isolates failures by scope: a [`Error::ZoneLookup`]
//! skips one zone, a [`Error::Mutation`] skips one record and an
//! [`Error::IpSource`] skips one whole cycle. None of them are fatal to
//! the daemon.

use thiserror::Error;

/// Result type alias for hddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the hddns system
#[derive(Error, Debug)]
pub enum Error {
    /// Public IP discovery failed
    #[error("IP source error: {0}")]
    IpSource(String),

    /// Fetching a zone's existing record sets failed
    #[error("Failed to fetch record sets for zone {zone}: {message}")]
    ZoneLookup {
        /// Zone name
        zone: String,
        /// Underlying failure
        message: String,
    },

    /// A create or update call for a single record failed
    #[error("Failed to sync record {name} ({record_type}) in zone {zone}: {message}")]
    Mutation {
        /// Zone name
        zone: String,
        /// Record name within the zone
        name: String,
        /// Record type
        record_type: String,
        /// Underlying failure
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors (config loading)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
        /// Whether a later attempt may succeed (server-side or network failure)
        transient: bool,
    },
}

impl Error {
    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create a zone lookup error
    pub fn zone_lookup(zone: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ZoneLookup {
            zone: zone.into(),
            message: message.into(),
        }
    }

    /// Create a record mutation error
    pub fn mutation(
        zone: impl Into<String>,
        name: impl Into<String>,
        record_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Mutation {
            zone: zone.into(),
            name: name.into(),
            record_type: record_type.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Create a provider error that may clear up on its own (5xx, network)
    pub fn transient_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Whether the next poll cycle may reasonably succeed where this one failed
    ///
    /// Used only to pick the log level; nothing is retried within a cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::IpSource(_) | Self::Provider { transient: true, .. }
        )
    }
}
