//! Dispatch sinks for metric records.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use zenoh::Session;

use crate::error::SinkError;
use crate::status::BridgeStatus;
use crate::telemetry::{Format, MetricRecord, encode};

/// Destination for the records produced by a poll cycle.
///
/// Called once per emitted metric; ordering across calls is not significant.
pub trait MetricSink {
    fn emit(&self, record: &MetricRecord) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Publishes records to Zenoh.
///
/// Key expressions follow `<key_prefix>/<cluster>/<member>/<metric path>`,
/// e.g. `zensight/etcd/prod/10.0.0.1:2379/etcd/store/watchers`. Records with a
/// series get it as a last chunk:
/// `zensight/etcd/prod/10.0.0.1:2379/etcd/leader/counts/success/10.0.0.2:2379`.
#[derive(Clone, Debug)]
pub struct ZenohSink {
    session: Arc<Session>,
    key_prefix: String,
    cluster: String,
    format: Format,
}

impl ZenohSink {
    pub fn new(
        session: Arc<Session>,
        key_prefix: impl Into<String>,
        cluster: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            session,
            key_prefix: key_prefix.into(),
            cluster: cluster.into(),
            format,
        }
    }

    /// Key expression a record is published on.
    pub fn key_for(&self, record: &MetricRecord) -> String {
        build_key_expr(
            &self.key_prefix,
            &self.cluster,
            &record.source,
            &record.key_path(),
        )
    }

    /// Publish the bridge status document on `<key_prefix>/@/status`.
    pub async fn publish_status(&self, status: &BridgeStatus) -> Result<(), SinkError> {
        let key = format!("{}/@/status", self.key_prefix);
        let payload = serde_json::to_vec(status)?;
        self.put(&key, payload).await
    }

    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        self.session
            .put(key, payload)
            .await
            .map_err(|e| SinkError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl MetricSink for ZenohSink {
    async fn emit(&self, record: &MetricRecord) -> Result<(), SinkError> {
        let key = self.key_for(record);
        let payload = encode(record, self.format)?;
        self.put(&key, payload).await?;
        tracing::trace!(key = %key, value = record.value, "Published");
        Ok(())
    }
}

/// Build a key expression for an etcd metric.
pub fn build_key_expr(prefix: &str, cluster: &str, member: &str, path: &str) -> String {
    format!("{}/{}/{}/{}", prefix, cluster, member, path)
}

/// Keeps every emitted record in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<MetricRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far.
    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().clone()
    }

    /// Remove and return the records emitted so far.
    pub fn take(&self) -> Vec<MetricRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl MetricSink for MemorySink {
    async fn emit(&self, record: &MetricRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
