//! Configuration for the uplink replicator.
//!
//! The configuration document is TOML with two reserved top-level tables,
//! `local` and `cloud`, holding store connection parameters; every other
//! top-level table is one source definition. Source iteration order is
//! document order.
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicatorConfig
//! ├── local: StoreConfig       # local store connection
//! ├── remote: StoreConfig      # remote ("cloud") store connection
//! └── sources: Vec<SourceDefinition>  # one per non-reserved table
//! ```
//!
//! # TOML Example
//!
//! ```toml
//! [local]
//! host = "127.0.0.1"
//! port = 8086
//! database = "telemetry"
//!
//! [cloud]
//! endpoint = "storage.example.com"   # `host` is also accepted
//! port = 8086
//! database = "telemetry"
//! secure = true
//! username = "writer"
//! password = "hunter2"
//!
//! [bedroom_temp]
//! measurement = "temp"
//! fields = ["value"]
//! tags = { room = "bedroom" }
//! limit = 500
//! ```

use crate::error::{ReplicationError, Result};
use crate::point::STATUS_FIELD;
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Reserved table name for the local store's connection parameters.
pub const LOCAL_TABLE: &str = "local";

/// Reserved table name for the remote store's connection parameters.
pub const REMOTE_TABLE: &str = "cloud";

// ═══════════════════════════════════════════════════════════════════════════════
// StoreConfig: connection parameters for one store instance
// ═══════════════════════════════════════════════════════════════════════════════

/// Connection parameters for a single time-series store.
///
/// The remote store's table historically names its host `endpoint`; the
/// alias keeps existing documents working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Hostname or IP of the store.
    #[serde(alias = "endpoint")]
    pub host: String,

    /// HTTP API port.
    pub port: u16,

    /// Database name queries and writes are scoped to.
    pub database: String,

    /// Use TLS (`https`) for the connection.
    #[serde(default = "default_false")]
    pub secure: bool,

    /// Basic-auth username. Must be set together with `password`.
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password.
    #[serde(default)]
    pub password: Option<String>,

    /// Verify the store's TLS certificate. Disable for self-signed
    /// endpoints.
    #[serde(default = "default_true")]
    pub verify_certs: bool,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
            database: "telemetry".to_string(),
            secure: false,
            username: None,
            password: None,
            verify_certs: true,
        }
    }
}

impl StoreConfig {
    /// Base URL for HTTP requests, e.g. `https://host:port`.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// `host:port` form used in logs and error context.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Create a store config for testing.
    pub fn for_testing(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SourceDefinition: one replication stream
// ═══════════════════════════════════════════════════════════════════════════════

/// One replication stream: which points to fetch and how many per cycle.
///
/// Read-only to the engine. `fields` order is preserved into the fetch
/// statement; `tags` form an equality conjunction in the fetch filter and
/// are copied verbatim onto every fetched point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Source name, filled from the configuration table key.
    #[serde(skip)]
    pub name: String,

    /// Measurement the points live in.
    pub measurement: String,

    /// Field names to fetch, in statement order.
    pub fields: Vec<String>,

    /// Tag equality filter; also the tag set stamped onto fetched points.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Maximum points per fetch cycle.
    pub limit: usize,
}

impl SourceDefinition {
    /// Create a single-field source for testing.
    pub fn for_testing(name: &str, measurement: &str) -> Self {
        Self {
            name: name.to_string(),
            measurement: measurement.to_string(),
            fields: vec!["value".to_string()],
            tags: BTreeMap::new(),
            limit: 100,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ReplicatorConfig: the whole document
// ═══════════════════════════════════════════════════════════════════════════════

/// The parsed configuration document.
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    /// Local store connection parameters (`[local]`).
    pub local: StoreConfig,

    /// Remote store connection parameters (`[cloud]`).
    pub remote: StoreConfig,

    /// Source definitions, in document order.
    pub sources: Vec<SourceDefinition>,
}

impl ReplicatorConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "reading configuration");
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReplicationError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse a configuration document.
    ///
    /// The reserved `local` and `cloud` tables become the store configs;
    /// every remaining top-level table becomes a source, in document
    /// order. The parsed config is validated before it is returned.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(raw)
            .map_err(|e| ReplicationError::Config(format!("parse error: {}", e)))?;

        let local = take_store(&mut table, LOCAL_TABLE)?;
        let remote = take_store(&mut table, REMOTE_TABLE)?;

        let mut sources = Vec::with_capacity(table.len());
        for (name, value) in table {
            let mut source: SourceDefinition = value.try_into().map_err(|e| {
                ReplicationError::Config(format!("source [{}]: {}", name, e))
            })?;
            source.name = name;
            sources.push(source);
        }

        let config = Self {
            local,
            remote,
            sources,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the parsed document for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_store(LOCAL_TABLE, &self.local)?;
        validate_store(REMOTE_TABLE, &self.remote)?;

        if self.sources.is_empty() {
            return Err(ReplicationError::Config(
                "no source definitions configured".to_string(),
            ));
        }
        for source in &self.sources {
            if source.measurement.is_empty() {
                return Err(ReplicationError::Config(format!(
                    "source [{}]: measurement must not be empty",
                    source.name
                )));
            }
            if source.fields.is_empty() {
                return Err(ReplicationError::Config(format!(
                    "source [{}]: at least one field is required",
                    source.name
                )));
            }
            if source.fields.iter().any(|f| f == STATUS_FIELD) {
                return Err(ReplicationError::Config(format!(
                    "source [{}]: the {} field is reserved",
                    source.name, STATUS_FIELD
                )));
            }
            if source.limit == 0 {
                return Err(ReplicationError::Config(format!(
                    "source [{}]: limit must be at least 1",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Create a one-source config for testing.
    pub fn for_testing() -> Self {
        Self {
            local: StoreConfig::for_testing("127.0.0.1", 8086),
            remote: StoreConfig::for_testing("127.0.0.1", 9086),
            sources: vec![SourceDefinition::for_testing("test_source", "temp")],
        }
    }
}

fn take_store(table: &mut toml::Table, name: &str) -> Result<StoreConfig> {
    let value = table.remove(name).ok_or_else(|| {
        ReplicationError::Config(format!("missing required [{}] table", name))
    })?;
    value
        .try_into()
        .map_err(|e| ReplicationError::Config(format!("[{}]: {}", name, e)))
}

fn validate_store(name: &str, store: &StoreConfig) -> Result<()> {
    if store.host.is_empty() {
        return Err(ReplicationError::Config(format!(
            "[{}]: host must not be empty",
            name
        )));
    }
    if store.port == 0 {
        return Err(ReplicationError::Config(format!(
            "[{}]: port must not be zero",
            name
        )));
    }
    if store.database.is_empty() {
        return Err(ReplicationError::Config(format!(
            "[{}]: database must not be empty",
            name
        )));
    }
    if store.username.is_some() != store.password.is_some() {
        return Err(ReplicationError::Config(format!(
            "[{}]: username and password must be set together",
            name
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// EngineSettings: loop pacing (code preset, not part of the document)
// ═══════════════════════════════════════════════════════════════════════════════

/// Pacing for the replication loop.
///
/// Deliberately not part of the configuration document (its shape is
/// fixed: two reserved tables plus sources). Tests use
/// [`EngineSettings::testing`] to run the same loop under a paused clock.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Retry policy for connectivity waits.
    pub connect_retry: RetryPolicy,

    /// Pause after each source's cycle.
    pub source_pause: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            connect_retry: RetryPolicy::connect(),
            source_pause: Duration::from_secs(5),
        }
    }
}

impl EngineSettings {
    /// Millisecond pacing for tests.
    pub fn testing() -> Self {
        Self {
            connect_retry: RetryPolicy::testing(),
            source_pause: Duration::from_millis(10),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
