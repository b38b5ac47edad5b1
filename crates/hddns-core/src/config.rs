//! Configuration types for the hddns system
//!
//! The configuration is a JSON file with a `global` section and a list of
//! `zones`. It is parsed into [`RawConfig`], resolved against the
//! environment (`"ENV:NAME"` references) and validated once, producing a
//! [`DdnsConfig`] that the engine treats as immutable for a cycle.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Prefix marking a value as an environment variable reference
pub const ENV_PREFIX: &str = "ENV:";

/// Default poll interval in seconds
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

/// Default record TTL in seconds
pub const DEFAULT_TTL: u32 = 300;

/// Default public IP endpoint
pub const DEFAULT_IP_CHECK_URL: &str = "https://ifconfig.me";

/// A configuration string that may point at an environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// Used verbatim
    Literal(String),
    /// Name of an environment variable holding the value
    EnvRef(String),
}

impl ConfigValue {
    /// Resolve the value with the given environment lookup
    pub fn resolve<F>(&self, env: F) -> crate::Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            ConfigValue::Literal(value) => Ok(value.clone()),
            ConfigValue::EnvRef(name) => env(name).ok_or_else(|| {
                crate::Error::config(format!("Environment variable '{}' not set", name))
            }),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        match value.strip_prefix(ENV_PREFIX) {
            Some(name) => ConfigValue::EnvRef(name.to_string()),
            None => ConfigValue::Literal(value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ConfigValue::from(value.as_str()))
    }
}

/// Configuration file as written on disk, before environment resolution
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    /// Global settings
    pub global: RawGlobalConfig,

    /// Zones to manage
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

/// `global` section as written on disk
#[derive(Debug, Clone, Deserialize)]
pub struct RawGlobalConfig {
    /// Hetzner API token
    #[serde(default = "empty_value")]
    pub api_token: ConfigValue,

    /// Poll period in seconds
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_seconds: u64,

    /// TTL used when neither the record nor its zone sets one
    #[serde(default = "default_ttl")]
    pub ttl_default: u32,

    /// Endpoint returning the caller's public IP as plain text
    #[serde(default = "default_ip_check_url")]
    pub ip_check_url: ConfigValue,
}

impl RawConfig {
    /// Parse a configuration document
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve environment references, producing the final configuration
    ///
    /// Record types are normalized to upper case. The result is not yet
    /// validated; see [`DdnsConfig::validate`].
    pub fn resolve<F>(self, env: F) -> crate::Result<DdnsConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = self.global.api_token.resolve(&env)?;
        let ip_check_url = self.global.ip_check_url.resolve(&env)?;

        let zones = self
            .zones
            .into_iter()
            .map(|mut zone| {
                for record in &mut zone.records {
                    record.record_type = record.record_type.trim().to_ascii_uppercase();
                }
                zone
            })
            .collect();

        Ok(DdnsConfig {
            global: GlobalConfig {
                api_token,
                check_interval_seconds: self.global.check_interval_seconds,
                ttl_default: self.global.ttl_default,
                ip_check_url,
            },
            zones,
        })
    }
}

/// Resolved hddns configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdnsConfig {
    /// Global settings
    pub global: GlobalConfig,

    /// Zones to manage, in file order
    pub zones: Vec<ZoneConfig>,
}

impl DdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        self.global.validate()?;

        if self.zones.is_empty() {
            return Err(crate::Error::config("At least one zone must be configured"));
        }

        let mut zone_names = HashSet::new();
        for zone in &self.zones {
            zone.validate()?;
            if !zone_names.insert(zone.name.as_str()) {
                return Err(crate::Error::config(format!(
                    "Zone '{}' is configured more than once",
                    zone.name
                )));
            }
        }

        Ok(())
    }

    /// Short description for logging: zone and record counts
    pub fn summary(&self) -> String {
        let records: usize = self.zones.iter().map(|zone| zone.records.len()).sum();
        format!("{} zone(s), {} record(s)", self.zones.len(), records)
    }
}

/// Resolved global settings
#[derive(Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Hetzner API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Poll period in seconds
    pub check_interval_seconds: u64,

    /// TTL used when neither the record nor its zone sets one
    pub ttl_default: u32,

    /// Endpoint returning the caller's public IP as plain text
    pub ip_check_url: String,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("api_token", &"<REDACTED>")
            .field("check_interval_seconds", &self.check_interval_seconds)
            .field("ttl_default", &self.ttl_default)
            .field("ip_check_url", &self.ip_check_url)
            .finish()
    }
}

impl GlobalConfig {
    /// Validate the global settings
    pub fn validate(&self) -> crate::Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(crate::Error::config(
                "API token is required (global.api_token)",
            ));
        }
        if self.check_interval_seconds == 0 {
            return Err(crate::Error::config(
                "global.check_interval_seconds must be > 0",
            ));
        }
        if self.ip_check_url.is_empty() {
            return Err(crate::Error::config("global.ip_check_url cannot be empty"));
        }
        Ok(())
    }
}

/// A DNS zone and the records to keep in sync inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone name (e.g. "example.com")
    #[serde(default)]
    pub name: String,

    /// Zone-wide default TTL, overriding the global default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Records to manage, in file order
    #[serde(default)]
    pub records: Vec<RecordConfig>,
}

impl ZoneConfig {
    /// Create a zone with no records
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            records: Vec::new(),
        }
    }

    /// Add a record
    pub fn with_record(mut self, record: RecordConfig) -> Self {
        self.records.push(record);
        self
    }

    /// Set the zone-wide TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Validate the zone and its records
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Each zone must have a 'name' field"));
        }
        if self.records.is_empty() {
            return Err(crate::Error::config(format!(
                "Zone '{}' has no records configured",
                self.name
            )));
        }

        let mut keys = HashSet::new();
        for record in &self.records {
            record.validate(&self.name)?;
            if !keys.insert((record.name.as_str(), record.record_type.as_str())) {
                return Err(crate::Error::config(format!(
                    "Record '{}' ({}) is configured more than once in zone '{}'",
                    record.name, record.record_type, self.name
                )));
            }
        }

        Ok(())
    }
}

/// Where a record's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordMode {
    /// Value taken from the configuration
    #[default]
    Static,
    /// Value is always the host's current public IP
    DynamicIp,
}

/// A desired DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Label within the zone; "@" is the apex
    #[serde(default)]
    pub name: String,

    /// Record type (A, AAAA, CNAME, TXT, MX, ...)
    #[serde(rename = "type", default)]
    pub record_type: String,

    /// Value source
    #[serde(default)]
    pub mode: RecordMode,

    /// Configured value, required for static records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// TTL override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl RecordConfig {
    /// Create a static record
    pub fn new_static(
        name: impl Into<String>,
        record_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            mode: RecordMode::Static,
            value: Some(value.into()),
            ttl: None,
        }
    }

    /// Create a record that follows the public IP
    pub fn new_dynamic(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            mode: RecordMode::DynamicIp,
            value: None,
            ttl: None,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Validate the record within its zone
    pub fn validate(&self, zone: &str) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config(format!(
                "A record in zone '{}' has no 'name'",
                zone
            )));
        }
        if self.record_type.trim().is_empty() {
            return Err(crate::Error::config(format!(
                "Record '{}' in zone '{}' has no 'type'",
                self.name, zone
            )));
        }

        match self.mode {
            RecordMode::Static => {
                if self.value.as_deref().is_none_or(str::is_empty) {
                    return Err(crate::Error::config(format!(
                        "Record '{}' in zone '{}' uses static mode but has no 'value' specified",
                        self.name, zone
                    )));
                }
            }
            RecordMode::DynamicIp => {
                if self.value.is_some() {
                    warn!(
                        "Record '{}' in zone '{}' uses dynamic-ip mode; its 'value' is ignored",
                        self.name, zone
                    );
                }
            }
        }

        Ok(())
    }
}

/// Load, resolve and validate a configuration file
///
/// Environment references are resolved against the process environment.
pub fn load_config(path: impl AsRef<Path>) -> crate::Result<DdnsConfig> {
    let path = path.as_ref();
    let contents = read_config_file(path)?;
    let config = parse_config(&contents)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

fn read_config_file(path: &Path) -> crate::Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            crate::Error::config(format!("Config file not found: {}", path.display()))
        }
        _ => crate::Error::Io(e),
    })
}

fn parse_config(contents: &str) -> crate::Result<DdnsConfig> {
    let config = RawConfig::from_json(contents)?.resolve(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Detects edits to the configuration file between poll cycles
///
/// The watcher remembers a SHA-256 digest of the file contents. A changed
/// file that fails to load is reported once; the caller keeps its
/// previous configuration until the file is fixed.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    digest: Option<Vec<u8>>,
}

impl ConfigWatcher {
    /// Load the configuration and start watching the file
    pub fn open(path: impl Into<PathBuf>) -> crate::Result<(Self, DdnsConfig)> {
        let path = path.into();
        let contents = read_config_file(&path)?;
        let config = parse_config(&contents)?;
        info!("Configuration loaded from {}", path.display());

        let watcher = Self {
            digest: Some(digest(&contents)),
            path,
        };
        Ok((watcher, config))
    }

    /// Path being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the file for changes
    ///
    /// # Returns
    ///
    /// - `Ok(Some(config))`: The file changed and the new contents are valid
    /// - `Ok(None)`: No change since the last poll
    /// - `Err(Error)`: The file changed but could not be loaded
    pub fn poll(&mut self) -> crate::Result<Option<DdnsConfig>> {
        let contents = read_config_file(&self.path)?;
        let current = digest(&contents);

        if self.digest.as_ref() == Some(&current) {
            return Ok(None);
        }

        // Remember the digest even on failure so a broken edit is reported once.
        self.digest = Some(current);
        let config = parse_config(&contents)?;
        info!("Configuration file changed, reloaded: {}", config.summary());
        Ok(Some(config))
    }
}

fn digest(contents: &str) -> Vec<u8> {
    Sha256::digest(contents.as_bytes()).to_vec()
}

fn empty_value() -> ConfigValue {
    ConfigValue::Literal(String::new())
}

fn default_check_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_ip_check_url() -> ConfigValue {
    ConfigValue::Literal(DEFAULT_IP_CHECK_URL.to_string())
}
