//! Configuration for the etcd bridge.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dimensions;
use crate::error::ConfigError;
use crate::filter::OptionalMetricFilter;
use crate::telemetry::Format;

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdBridgeConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Serialization format for published records.
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// etcd polling settings.
    pub etcd: EtcdConfig,
}

/// Zenoh connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (for client mode).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (for peer/router mode).
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Settings for the polled etcd member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Key expression prefix (default: "zensight/etcd").
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Cluster name, used in key expressions.
    #[serde(default)]
    pub cluster: String,

    /// Host of the etcd member.
    #[serde(default)]
    pub host: String,

    /// Client port of the etcd member.
    #[serde(default)]
    pub port: u16,

    /// Poll interval in seconds (default: 10).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout applied to each HTTP call in seconds (default: 10).
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// How many cycles a previously observed role may be reused when the
    /// self endpoint cannot be read. Zero disables the carry-over.
    #[serde(default = "default_role_staleness")]
    pub role_staleness_cycles: u32,

    /// Custom dimensions attached to every record.
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,

    /// Emit every metric from the /metrics endpoint except the excluded ones.
    #[serde(default)]
    pub enhanced_metrics: bool,

    /// Metrics from the /metrics endpoint to emit when enhanced metrics are off.
    #[serde(default)]
    pub include_metrics: BTreeSet<String>,

    /// Metrics from the /metrics endpoint to skip when enhanced metrics are on.
    #[serde(default)]
    pub exclude_metrics: BTreeSet<String>,

    /// TLS settings for the HTTP client.
    #[serde(default)]
    pub tls: TlsConfig,
}

fn default_key_prefix() -> String {
    "zensight/etcd".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_http_timeout() -> u64 {
    10
}

fn default_role_staleness() -> u32 {
    1
}

/// TLS configuration for the etcd client endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Use https to reach the member.
    #[serde(default)]
    pub enabled: bool,

    /// Verify the server certificate (default: true).
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Path to a PEM CA bundle used to verify the server.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Path to the PEM client certificate.
    #[serde(default)]
    pub client_cert: Option<PathBuf>,

    /// Path to the PEM client private key.
    #[serde(default)]
    pub client_key: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verify: true,
            ca_cert: None,
            client_cert: None,
            client_key: None,
        }
    }
}

impl EtcdBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: EtcdBridgeConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.etcd.validate()
    }
}

impl EtcdConfig {
    /// Validate the etcd settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host"));
        }
        if self.port == 0 {
            return Err(ConfigError::Missing("port"));
        }
        if self.cluster.trim().is_empty() {
            return Err(ConfigError::Missing("cluster"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http_timeout_secs must be > 0".to_string(),
            ));
        }
        for (key, value) in &self.dimensions {
            if key.is_empty() || !dimensions::is_plain(key) || !dimensions::is_plain(value) {
                return Err(ConfigError::Validation(format!(
                    "dimension '{}: {}' must not contain whitespace, quotes, brackets, ',' or '='",
                    key, value
                )));
            }
        }
        if self.tls.client_cert.is_some() != self.tls.client_key.is_some() {
            return Err(ConfigError::Validation(
                "tls.client_cert and tls.client_key must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Identifier of the polled member, `host:port`.
    pub fn member_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of the polled member.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls.enabled { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Build the optional-metric filter from the include/exclude settings.
    pub fn optional_filter(&self) -> OptionalMetricFilter {
        OptionalMetricFilter::new(
            self.enhanced_metrics,
            self.include_metrics.clone(),
            self.exclude_metrics.clone(),
        )
    }
}
