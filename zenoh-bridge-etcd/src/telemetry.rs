use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Kind of an emitted metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Counter (monotonically increasing).
    Counter,

    /// Gauge (can go up or down).
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single metric record handed to the dispatch sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Unix epoch milliseconds when the cycle read the value.
    pub timestamp: i64,

    /// Member the value was read from (`host:port`).
    pub source: String,

    /// Canonical metric name (e.g., "etcd.self.sendappendreq.cnt").
    pub name: String,

    /// The measured value.
    pub value: f64,

    /// Counter or gauge.
    pub kind: MetricKind,

    /// Member id followed by the bracketed dimension block.
    pub instance: String,

    /// Distinguishes records of the same metric within one member, e.g. the
    /// follower of a leader metric or the label block of an exposition metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
}

impl MetricRecord {
    /// Create a new record stamped with the current time.
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        value: f64,
        kind: MetricKind,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: source.into(),
            name: name.into(),
            value,
            kind,
            instance: instance.into(),
            series: None,
        }
    }

    /// Set the series segment. Empty strings leave the record without one.
    pub fn with_series(mut self, series: Option<&str>) -> Self {
        self.series = series.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// Metric name as a key expression path (`etcd.store.watchers` -> `etcd/store/watchers`).
    pub fn metric_path(&self) -> String {
        self.name.replace('.', "/")
    }

    /// Key expression path of the record: the metric path, followed by the
    /// series as one extra chunk when present.
    ///
    /// `/` and the Zenoh wildcard characters are replaced with `_` so the
    /// series always stays a single chunk.
    pub fn key_path(&self) -> String {
        match &self.series {
            Some(series) => format!("{}/{}", self.metric_path(), key_chunk(series)),
            None => self.metric_path(),
        }
    }
}

fn key_chunk(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '*' | '$' | '?' | '#' => '_',
            c => c,
        })
        .collect()
}

/// Serialization format for published records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON format (human-readable, good for debugging).
    #[default]
    Json,

    /// CBOR format (compact binary).
    Cbor,
}

/// Encode a value to bytes using the specified format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>, SinkError> {
    match format {
        Format::Json => Ok(serde_json::to_vec(value)?),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            Ok(buf)
        }
    }
}
