//! Fixed metric tables for the v2 stats endpoints.
//!
//! Each table maps a field name of an etcd JSON payload to the canonical
//! metric name and kind it is published under. Fields that are not listed
//! are ignored.

use serde_json::Value;

use crate::telemetry::MetricKind;

/// Canonical name and kind of a known metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub kind: MetricKind,
}

const fn counter(name: &'static str) -> MetricDescriptor {
    MetricDescriptor {
        name,
        kind: MetricKind::Counter,
    }
}

const fn gauge(name: &'static str) -> MetricDescriptor {
    MetricDescriptor {
        name,
        kind: MetricKind::Gauge,
    }
}

/// A closed mapping from payload field to [`MetricDescriptor`].
#[derive(Debug, Clone, Copy)]
pub struct MetricTable {
    entries: &'static [(&'static str, MetricDescriptor)],
}

impl MetricTable {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static MetricDescriptor)> {
        self.entries.iter().map(|(key, descriptor)| (*key, descriptor))
    }

    /// Pick every known field out of a JSON object.
    ///
    /// Returns one entry per table field present in `payload` with a numeric
    /// value, in table order. Non-numeric values are skipped.
    pub fn extract(&self, payload: &Value) -> Vec<(&'static MetricDescriptor, f64)> {
        let Some(object) = payload.as_object() else {
            return Vec::new();
        };

        self.iter()
            .filter_map(|(field, descriptor)| {
                let value = object.get(field)?;
                match value.as_f64() {
                    Some(v) => Some((descriptor, v)),
                    None => {
                        tracing::debug!(field, value = %value, "Skipping non-numeric field");
                        None
                    }
                }
            })
            .collect()
    }
}

/// `/v2/stats/self`
pub const SELF_METRICS: MetricTable = MetricTable {
    entries: &[
        ("recvAppendRequestCnt", counter("etcd.self.recvappendreq.cnt")),
        ("sendAppendRequestCnt", counter("etcd.self.sendappendreq.cnt")),
        ("recvPkgRate", gauge("etcd.self.recvpkg.rate")),
        ("recvBandwidthRate", gauge("etcd.self.recvbandwidth.rate")),
        ("sendPkgRate", gauge("etcd.self.sendpkg.rate")),
        ("sendBandwidthRate", gauge("etcd.self.sendbandwidth.rate")),
    ],
};

/// `/v2/stats/store`, reported by every member.
pub const STORE_METRICS: MetricTable = MetricTable {
    entries: &[
        ("getsFail", counter("etcd.store.gets.fail")),
        ("getsSuccess", counter("etcd.store.gets.success")),
        ("expireCount", counter("etcd.store.expire.count")),
        ("watchers", gauge("etcd.store.watchers")),
    ],
};

/// `/v2/stats/store` modification counters.
///
/// These are global to the cluster, so only the leader reports them.
pub const STORE_METRICS_LEADER: MetricTable = MetricTable {
    entries: &[
        ("compareAndDeleteFail", counter("etcd.store.compareanddelete.fail")),
        ("compareAndDeleteSuccess", counter("etcd.store.compareanddelete.success")),
        ("compareAndSwapFail", counter("etcd.store.compareandswap.fail")),
        ("compareAndSwapSuccess", counter("etcd.store.compareandswap.success")),
        ("createFail", counter("etcd.store.create.fail")),
        ("createSuccess", counter("etcd.store.create.success")),
        ("deleteFail", counter("etcd.store.delete.fail")),
        ("deleteSuccess", counter("etcd.store.delete.success")),
        ("updateFail", counter("etcd.store.update.fail")),
        ("updateSuccess", counter("etcd.store.update.success")),
        ("setsFail", counter("etcd.store.sets.fail")),
        ("setsSuccess", counter("etcd.store.sets.success")),
    ],
};

/// `/v2/stats/leader` -> `followers.<id>.counts`
pub const LEADER_METRICS_COUNTS: MetricTable = MetricTable {
    entries: &[
        ("fail", counter("etcd.leader.counts.fail")),
        ("success", counter("etcd.leader.counts.success")),
    ],
};

/// `/v2/stats/leader` -> `followers.<id>.latency`
pub const LEADER_METRICS_LATENCY: MetricTable = MetricTable {
    entries: &[
        ("average", gauge("etcd.leader.latency.average")),
        ("current", gauge("etcd.leader.latency.current")),
        ("maximum", gauge("etcd.leader.latency.max")),
        ("minimum", gauge("etcd.leader.latency.min")),
        ("standardDeviation", gauge("etcd.leader.latency.stddev")),
    ],
};
