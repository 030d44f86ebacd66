//! etcd member polling.
//!
//! One cycle runs four stages in a fixed order:
//!
//! 1. self: `/v2/stats/self`, decides the member's role for the cycle;
//! 2. store: `/v2/stats/store`, plus the modification counters when leader;
//! 3. leader: `/v2/stats/leader` per-follower counts and latency, leader only;
//! 4. optional: `/metrics`, filtered by the include/exclude settings, only
//!    when enhanced metrics are on or the include list is non-empty.
//!
//! The member listing, self, store and `/metrics` requests do not depend on
//! each other and are issued together; the leader request waits for the
//! role. A failed request only empties its own stage.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::config::EtcdConfig;
use crate::dimensions::Dimensions;
use crate::exposition;
use crate::filter::OptionalMetricFilter;
use crate::http::{
    Fetcher, LEADER_STATS_PATH, MEMBERS_PATH, METRICS_PATH, SELF_STATS_PATH, STORE_STATS_PATH,
};
use crate::sink::MetricSink;
use crate::tables::{
    LEADER_METRICS_COUNTS, LEADER_METRICS_LATENCY, MetricTable, SELF_METRICS, STORE_METRICS,
    STORE_METRICS_LEADER,
};
use crate::telemetry::{MetricKind, MetricRecord};
use crate::topology::{Role, Topology};

/// Static settings of a poller, resolved from configuration once.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub base_url: String,
    pub member_id: String,
    pub poll_interval: Duration,
    pub custom_dimensions: BTreeMap<String, String>,
    pub filter: OptionalMetricFilter,
    pub role_staleness_cycles: u32,
}

impl PollSettings {
    pub fn from_config(config: &EtcdConfig) -> Self {
        Self {
            base_url: config.base_url(),
            member_id: config.member_id(),
            poll_interval: config.poll_interval(),
            custom_dimensions: config.dimensions.clone(),
            filter: config.optional_filter(),
            role_staleness_cycles: config.role_staleness_cycles,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// State handed from one cycle to the next.
///
/// `role_age` counts the cycles since `role` was last read from the self
/// endpoint; a role older than the configured staleness window is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    pub role: Role,
    pub role_age: u32,
    pub topology: Topology,
}

impl PollState {
    /// Role to use when the self endpoint could not be read this cycle.
    fn carried_role(&self, staleness_cycles: u32) -> (Role, u32) {
        if self.role != Role::Unknown && self.role_age < staleness_cycles {
            (self.role, self.role_age + 1)
        } else {
            (Role::Unknown, 0)
        }
    }
}

/// Outcome of a single cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Role used by the cycle.
    pub role: Role,
    pub self_metrics: usize,
    pub store_metrics: usize,
    pub leader_metrics: usize,
    pub optional_metrics: usize,
    /// Records the sink refused.
    pub failed_emits: usize,
    /// Stages whose endpoint could not be read.
    pub skipped_stages: usize,
}

impl CycleReport {
    /// Total number of records emitted.
    pub fn total(&self) -> usize {
        self.self_metrics + self.store_metrics + self.leader_metrics + self.optional_metrics
    }
}

/// Poller for a single etcd member.
pub struct EtcdPoller<F, S> {
    settings: PollSettings,
    fetcher: F,
    sink: S,
    state: PollState,
}

impl<F: Fetcher, S: MetricSink> EtcdPoller<F, S> {
    pub fn new(settings: PollSettings, fetcher: F, sink: S) -> Self {
        Self {
            settings,
            fetcher,
            sink,
            state: PollState::default(),
        }
    }

    /// State carried into the next cycle.
    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the polling loop.
    pub async fn run(mut self) {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            member = %self.settings.member_id,
            url = %self.settings.base_url,
            interval_secs = self.settings.poll_interval.as_secs(),
            optional_metrics = self.settings.filter.is_active(),
            "Starting etcd poller"
        );

        loop {
            ticker.tick().await;

            let report = self.poll_once().await;
            debug!(
                member = %self.settings.member_id,
                role = %report.role,
                records = report.total(),
                failed = report.failed_emits,
                skipped_stages = report.skipped_stages,
                "Poll cycle complete"
            );
        }
    }

    /// Perform a single poll cycle.
    pub async fn poll_once(&mut self) -> CycleReport {
        let previous = std::mem::take(&mut self.state);
        let (report, next) = self.cycle(previous).await;
        self.state = next;
        report
    }

    async fn cycle(&self, previous: PollState) -> (CycleReport, PollState) {
        let settings = &self.settings;
        let optional_active = settings.filter.is_active();

        let members_url = settings.url(MEMBERS_PATH);
        let self_url = settings.url(SELF_STATS_PATH);
        let store_url = settings.url(STORE_STATS_PATH);
        let metrics_url = settings.url(METRICS_PATH);

        let (members, self_stats, store_stats, metrics_text) = tokio::join!(
            self.fetcher.fetch_json(&members_url),
            self.fetcher.fetch_json(&self_url),
            self.fetcher.fetch_json(&store_url),
            async {
                if optional_active {
                    self.fetcher.fetch_text(&metrics_url).await
                } else {
                    None
                }
            }
        );

        let topology = match members.as_ref().map(Topology::from_members) {
            Some(Some(topology)) => topology,
            Some(None) => {
                warn!(
                    endpoint = MEMBERS_PATH,
                    "Unexpected member listing, keeping previous topology"
                );
                previous.topology.clone()
            }
            None => previous.topology.clone(),
        };

        let (role, role_age) = match self_stats.as_ref().and_then(Role::from_self_stats) {
            Some(role) => (role, 0),
            None => {
                let carried = previous.carried_role(settings.role_staleness_cycles);
                warn!(
                    member = %settings.member_id,
                    previous = %previous.role,
                    role = %carried.0,
                    "Could not read role from self endpoint"
                );
                carried
            }
        };

        let mut report = CycleReport {
            role,
            ..CycleReport::default()
        };
        let base = Dimensions::for_role(role).merge(&settings.custom_dimensions);

        // self
        match self_stats {
            Some(payload) => {
                let tally = self.emit_table(&SELF_METRICS, &payload, &base, None).await;
                report.self_metrics = tally.emitted;
                report.failed_emits += tally.failed;
            }
            None => report.skipped_stages += 1,
        }

        // store
        match store_stats {
            Some(payload) => {
                let mut tally = self.emit_table(&STORE_METRICS, &payload, &base, None).await;
                if role.is_leader() {
                    tally += self
                        .emit_table(&STORE_METRICS_LEADER, &payload, &base, None)
                        .await;
                }
                report.store_metrics = tally.emitted;
                report.failed_emits += tally.failed;
            }
            None => report.skipped_stages += 1,
        }

        // leader
        if role.is_leader() {
            match self.fetcher.fetch_json(&settings.url(LEADER_STATS_PATH)).await {
                Some(payload) => {
                    let tally = self.emit_followers(role, &payload, &topology).await;
                    report.leader_metrics = tally.emitted;
                    report.failed_emits += tally.failed;
                }
                None => report.skipped_stages += 1,
            }
        }

        // optional
        if optional_active {
            match metrics_text {
                Some(text) => {
                    let tally = self.emit_optional(&text, &base).await;
                    report.optional_metrics = tally.emitted;
                    report.failed_emits += tally.failed;
                }
                None => report.skipped_stages += 1,
            }
        }

        let next = PollState {
            role,
            role_age,
            topology,
        };
        (report, next)
    }

    /// Emit every known field of `payload` found in `table`.
    async fn emit_table(
        &self,
        table: &MetricTable,
        payload: &Value,
        dimensions: &Dimensions,
        series: Option<&str>,
    ) -> Tally {
        let instance = dimensions.instance_key(&self.settings.member_id, "");
        let mut tally = Tally::default();

        for (descriptor, value) in table.extract(payload) {
            let record = self
                .record(descriptor.name, value, descriptor.kind, &instance)
                .with_series(series);
            tally.count(self.dispatch(&record).await);
        }

        tally
    }

    /// Emit per-follower counts and latency from a `/v2/stats/leader` payload.
    async fn emit_followers(&self, role: Role, payload: &Value, topology: &Topology) -> Tally {
        let mut tally = Tally::default();
        let Some(followers) = payload.get("followers").and_then(Value::as_object) else {
            return tally;
        };

        for (follower_id, stats) in followers {
            let follower = topology.display_name(follower_id);
            let dimensions = Dimensions::for_role(role)
                .with("follower", follower.as_str())
                .merge(&self.settings.custom_dimensions);

            if let Some(counts) = stats.get("counts") {
                tally += self
                    .emit_table(
                        &LEADER_METRICS_COUNTS,
                        counts,
                        &dimensions,
                        Some(follower.as_str()),
                    )
                    .await;
            }
            if let Some(latency) = stats.get("latency") {
                tally += self
                    .emit_table(
                        &LEADER_METRICS_LATENCY,
                        latency,
                        &dimensions,
                        Some(follower.as_str()),
                    )
                    .await;
            }
        }

        tally
    }

    /// Parse `/metrics` text and emit the metrics selected by the filter.
    async fn emit_optional(&self, text: &str, dimensions: &Dimensions) -> Tally {
        let parsed = exposition::parse(text);
        let mut tally = Tally::default();

        for metric in self.settings.filter.select(&parsed) {
            let Some(kind) = metric.kind.metric_kind() else {
                debug!(metric = %metric.raw_key, "Skipping metric without counter/gauge type");
                continue;
            };

            let instance = dimensions.instance_key(&self.settings.member_id, &metric.dimensions);
            let record = self
                .record(&metric.display_name, metric.value, kind, &instance)
                .with_series(Some(metric.dimensions.as_str()));
            tally.count(self.dispatch(&record).await);
        }

        tally
    }

    fn record(&self, name: &str, value: f64, kind: MetricKind, instance: &str) -> MetricRecord {
        MetricRecord::new(&self.settings.member_id, name, value, kind, instance)
    }

    /// Hand one record to the sink. Returns false if the sink refused it.
    async fn dispatch(&self, record: &MetricRecord) -> bool {
        match self.sink.emit(record).await {
            Ok(()) => true,
            Err(e) => {
                warn!(metric = %record.name, error = %e, "Failed to emit record");
                false
            }
        }
    }
}

/// Records emitted and refused by one stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    emitted: usize,
    failed: usize,
}

impl Tally {
    fn count(&mut self, emitted: bool) {
        if emitted {
            self.emitted += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl std::ops::AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.emitted += other.emitted;
        self.failed += other.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::config::EtcdBridgeConfig;
    use crate::sink::MemorySink;

    const BASE: &str = "http://10.0.0.1:2379";

    /// Serves canned payloads keyed by URL; anything else is absent.
    #[derive(Default)]
    struct StaticFetcher {
        json: Mutex<HashMap<String, Value>>,
        text: Mutex<HashMap<String, String>>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn with_json(self, path: &str, value: Value) -> Self {
            self.json.lock().insert(format!("{}{}", BASE, path), value);
            self
        }

        fn with_text(self, path: &str, text: &str) -> Self {
            self.text
                .lock()
                .insert(format!("{}{}", BASE, path), text.to_string());
            self
        }

        fn remove(&self, path: &str) {
            self.json.lock().remove(&format!("{}{}", BASE, path));
        }

        fn requested(&self, path: &str) -> bool {
            self.requests
                .lock()
                .iter()
                .any(|url| url == &format!("{}{}", BASE, path))
        }
    }

    impl Fetcher for StaticFetcher {
        async fn fetch_json(&self, url: &str) -> Option<Value> {
            self.requests.lock().push(url.to_string());
            self.json.lock().get(url).cloned()
        }

        async fn fetch_text(&self, url: &str) -> Option<String> {
            self.requests.lock().push(url.to_string());
            self.text.lock().get(url).cloned()
        }
    }

    fn settings(extra: &str) -> PollSettings {
        let config = EtcdBridgeConfig::parse(&format!(
            r#"{{ etcd: {{ host: "10.0.0.1", port: 2379, cluster: "test", {} }} }}"#,
            extra
        ))
        .unwrap();
        PollSettings::from_config(&config.etcd)
    }

    fn members() -> Value {
        json!({
            "members": [
                { "id": "a1", "clientURLs": ["http://10.0.0.1:2379"] },
                { "id": "b2", "clientURLs": ["http://10.0.0.2:2379"] },
                { "id": "c3", "clientURLs": ["http://10.0.0.3:2379"] },
            ]
        })
    }

    fn store_payload() -> Value {
        json!({
            "getsFail": 1,
            "getsSuccess": 10,
            "expireCount": 0,
            "watchers": 2,
            "createSuccess": 5,
            "createFail": 1,
            "deleteSuccess": 3,
            "compareAndSwapSuccess": 4,
        })
    }

    fn leader_payload() -> Value {
        json!({
            "leader": "a1",
            "followers": {
                "b2": {
                    "counts": { "fail": 0, "success": 100 },
                    "latency": {
                        "average": 0.5, "current": 0.4, "maximum": 2.0,
                        "minimum": 0.1, "standardDeviation": 0.2
                    }
                },
                "c3": {
                    "counts": { "fail": 1, "success": 90 },
                    "latency": {
                        "average": 0.6, "current": 0.5, "maximum": 3.0,
                        "minimum": 0.2, "standardDeviation": 0.3
                    }
                }
            }
        })
    }

    fn leader_fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .with_json(MEMBERS_PATH, members())
            .with_json(
                SELF_STATS_PATH,
                json!({ "state": "StateLeader", "sendAppendRequestCnt": 7, "recvPkgRate": 1.5 }),
            )
            .with_json(STORE_STATS_PATH, store_payload())
            .with_json(LEADER_STATS_PATH, leader_payload())
    }

    fn names(records: &[MetricRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_self_stats_single_record() {
        let fetcher = StaticFetcher::default().with_json(
            SELF_STATS_PATH,
            json!({ "state": "StateLeader", "sendAppendRequestCnt": 7 }),
        );
        let mut poller = EtcdPoller::new(settings(""), fetcher, MemorySink::new());

        let report = poller.poll_once().await;
        let records = poller.sink().records();

        assert_eq!(report.role, Role::Leader);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "etcd.self.sendappendreq.cnt");
        assert_eq!(records[0].value, 7.0);
        assert_eq!(records[0].kind, MetricKind::Counter);
        assert_eq!(records[0].instance, "10.0.0.1:2379[state=StateLeader]");
    }

    #[tokio::test]
    async fn test_leader_cycle() {
        let mut poller = EtcdPoller::new(settings(""), leader_fetcher(), MemorySink::new());

        let report = poller.poll_once().await;
        let records = poller.sink().records();

        assert_eq!(report.role, Role::Leader);
        assert_eq!(report.self_metrics, 2);
        // 4 common + 4 leader-only present in the payload
        assert_eq!(report.store_metrics, 8);
        // 2 followers x (2 counts + 5 latency)
        assert_eq!(report.leader_metrics, 14);
        assert_eq!(report.optional_metrics, 0);
        assert_eq!(report.total(), records.len());
        assert!(names(&records).contains(&"etcd.store.create.success"));

        let follower_b = records
            .iter()
            .filter(|r| r.instance == "10.0.0.1:2379[follower=10.0.0.2:2379,state=StateLeader]")
            .count();
        assert_eq!(follower_b, 7);

        let latency = records
            .iter()
            .find(|r| r.name == "etcd.leader.latency.max" && r.instance.contains("10.0.0.3"))
            .unwrap();
        assert_eq!(latency.value, 3.0);
        assert_eq!(latency.kind, MetricKind::Gauge);
    }

    #[tokio::test]
    async fn test_follower_records_carry_series() {
        let mut poller = EtcdPoller::new(settings(""), leader_fetcher(), MemorySink::new());
        poller.poll_once().await;
        let records = poller.sink().records();

        let success: Vec<_> = records
            .iter()
            .filter(|r| r.name == "etcd.leader.counts.success")
            .map(|r| r.key_path())
            .collect();
        assert_eq!(
            success,
            vec![
                "etcd/leader/counts/success/10.0.0.2:2379",
                "etcd/leader/counts/success/10.0.0.3:2379",
            ]
        );
        assert!(
            records
                .iter()
                .filter(|r| !r.name.starts_with("etcd.leader."))
                .all(|r| r.series.is_none())
        );
    }

    #[tokio::test]
    async fn test_follower_skips_leader_only_metrics() {
        let fetcher = leader_fetcher().with_json(
            SELF_STATS_PATH,
            json!({ "state": "StateFollower", "recvAppendRequestCnt": 12 }),
        );
        let mut poller = EtcdPoller::new(settings(""), fetcher, MemorySink::new());

        let report = poller.poll_once().await;
        let records = poller.sink().records();

        assert_eq!(report.role, Role::Follower);
        assert_eq!(report.store_metrics, 4);
        assert_eq!(report.leader_metrics, 0);
        assert!(!poller.fetcher.requested(LEADER_STATS_PATH));
        assert!(
            records
                .iter()
                .all(|r| STORE_METRICS_LEADER.iter().all(|(_, d)| d.name != r.name))
        );
        assert!(
            records
                .iter()
                .all(|r| r.instance == "10.0.0.1:2379[state=StateFollower]")
        );
    }

    #[tokio::test]
    async fn test_leader_endpoint_failure_keeps_other_stages() {
        let fetcher = leader_fetcher();
        fetcher.remove(LEADER_STATS_PATH);
        let mut poller = EtcdPoller::new(settings(""), fetcher, MemorySink::new());

        let report = poller.poll_once().await;

        assert_eq!(report.self_metrics, 2);
        assert_eq!(report.store_metrics, 8);
        assert_eq!(report.leader_metrics, 0);
        assert_eq!(report.skipped_stages, 1);
    }

    #[tokio::test]
    async fn test_everything_down() {
        let mut poller = EtcdPoller::new(
            settings("enhanced_metrics: true"),
            StaticFetcher::default(),
            MemorySink::new(),
        );

        let report = poller.poll_once().await;

        assert_eq!(report.total(), 0);
        assert_eq!(report.role, Role::Unknown);
        // self, store, optional
        assert_eq!(report.skipped_stages, 3);
    }

    #[tokio::test]
    async fn test_role_carried_within_staleness_window() {
        let mut poller = EtcdPoller::new(settings(""), leader_fetcher(), MemorySink::new());

        assert_eq!(poller.poll_once().await.role, Role::Leader);

        poller.fetcher.remove(SELF_STATS_PATH);

        // One cycle of grace: leader-only metrics keep flowing.
        let report = poller.poll_once().await;
        assert_eq!(report.role, Role::Leader);
        assert_eq!(report.store_metrics, 8);
        assert_eq!(report.leader_metrics, 14);
        assert_eq!(poller.state().role_age, 1);

        // Window exhausted.
        let report = poller.poll_once().await;
        assert_eq!(report.role, Role::Unknown);
        assert_eq!(report.store_metrics, 4);
        assert_eq!(report.leader_metrics, 0);
    }

    #[tokio::test]
    async fn test_role_not_carried_when_disabled() {
        let mut poller = EtcdPoller::new(
            settings("role_staleness_cycles: 0"),
            leader_fetcher(),
            MemorySink::new(),
        );

        assert_eq!(poller.poll_once().await.role, Role::Leader);
        poller.fetcher.remove(SELF_STATS_PATH);
        assert_eq!(poller.poll_once().await.role, Role::Unknown);
    }

    #[tokio::test]
    async fn test_topology_carried_when_members_fail() {
        let mut poller = EtcdPoller::new(settings(""), leader_fetcher(), MemorySink::new());
        poller.poll_once().await;
        assert_eq!(
            poller.state().topology.client_url("c3"),
            Some("http://10.0.0.3:2379")
        );

        poller.fetcher.remove(MEMBERS_PATH);
        poller.sink().take();
        poller.poll_once().await;

        assert_eq!(
            poller.state().topology.client_url("c3"),
            Some("http://10.0.0.3:2379")
        );
        assert!(
            poller
                .sink()
                .records()
                .iter()
                .any(|r| r.instance.contains("follower=10.0.0.2:2379"))
        );
    }

    #[tokio::test]
    async fn test_unknown_follower_uses_member_id() {
        let fetcher = leader_fetcher();
        fetcher.remove(MEMBERS_PATH);
        let mut poller = EtcdPoller::new(settings(""), fetcher, MemorySink::new());

        poller.poll_once().await;

        assert!(
            poller
                .sink()
                .records()
                .iter()
                .any(|r| r.instance.contains("follower=b2"))
        );
    }

    #[tokio::test]
    async fn test_custom_dimensions_applied() {
        let mut poller = EtcdPoller::new(
            settings(r#"dimensions: { region: "eu" }"#),
            leader_fetcher(),
            MemorySink::new(),
        );

        poller.poll_once().await;
        let records = poller.sink().records();

        assert!(records.iter().all(|r| r.instance.contains("region=eu")));
        assert!(
            records
                .iter()
                .any(|r| r.instance
                    == "10.0.0.1:2379[follower=10.0.0.3:2379,region=eu,state=StateLeader]")
        );
    }

    const METRICS_TEXT: &str = "\
# HELP etcd_server_has_leader Whether or not a leader exists.
# TYPE etcd_server_has_leader gauge
etcd_server_has_leader 1
# TYPE etcd_server_proposals_committed_total gauge
etcd_server_proposals_committed_total 42
# TYPE etcd_network_peer_sent_bytes_total counter
etcd_network_peer_sent_bytes_total{To=\"b2\"} 1024
# TYPE etcd_disk_wal_fsync_duration_seconds histogram
etcd_disk_wal_fsync_duration_seconds_bucket{le=\"0.001\"} 5
etcd_disk_wal_fsync_duration_seconds 9
# TYPE process_misc untyped
process_misc 3
";

    #[tokio::test]
    async fn test_optional_metrics_not_fetched_when_inactive() {
        let fetcher = leader_fetcher().with_text(METRICS_PATH, METRICS_TEXT);
        let mut poller = EtcdPoller::new(settings(""), fetcher, MemorySink::new());

        let report = poller.poll_once().await;

        assert_eq!(report.optional_metrics, 0);
        assert!(!poller.fetcher.requested(METRICS_PATH));
    }

    #[tokio::test]
    async fn test_optional_metrics_enhanced() {
        let fetcher = leader_fetcher().with_text(METRICS_PATH, METRICS_TEXT);
        let mut poller = EtcdPoller::new(
            settings(r#"enhanced_metrics: true, exclude_metrics: ["etcd_server_has_leader"]"#),
            fetcher,
            MemorySink::new(),
        );

        let report = poller.poll_once().await;
        let records = poller.sink().records();

        // histogram dropped, untyped never emitted, has_leader excluded
        assert_eq!(report.optional_metrics, 2);
        assert!(!names(&records).contains(&"etcd.server.has.leader"));

        let sent = records
            .iter()
            .find(|r| r.name == "etcd.network.peer.sent.bytes.total")
            .unwrap();
        assert_eq!(sent.kind, MetricKind::Counter);
        assert_eq!(sent.value, 1024.0);
        assert_eq!(sent.instance, "10.0.0.1:2379[state=StateLeader,To=b2]");
        assert_eq!(sent.key_path(), "etcd/network/peer/sent/bytes/total/To=b2");
    }

    #[tokio::test]
    async fn test_optional_metrics_include_only() {
        let fetcher = leader_fetcher().with_text(METRICS_PATH, METRICS_TEXT);
        let mut poller = EtcdPoller::new(
            settings(r#"include_metrics: ["etcd_server_has_leader", "not_there"]"#),
            fetcher,
            MemorySink::new(),
        );

        let report = poller.poll_once().await;
        let records = poller.sink().records();

        assert_eq!(report.optional_metrics, 1);
        let has_leader = records
            .iter()
            .find(|r| r.name == "etcd.server.has.leader")
            .unwrap();
        assert_eq!(has_leader.kind, MetricKind::Gauge);
        assert_eq!(has_leader.instance, "10.0.0.1:2379[state=StateLeader]");
    }

    #[tokio::test]
    async fn test_optional_endpoint_failure() {
        let mut poller = EtcdPoller::new(
            settings("enhanced_metrics: true"),
            leader_fetcher(),
            MemorySink::new(),
        );

        let report = poller.poll_once().await;

        assert_eq!(report.optional_metrics, 0);
        assert_eq!(report.skipped_stages, 1);
        assert_eq!(report.self_metrics, 2);
    }

    #[test]
    fn test_carried_role() {
        let state = PollState {
            role: Role::Follower,
            role_age: 0,
            topology: Topology::default(),
        };
        assert_eq!(state.carried_role(2), (Role::Follower, 1));
        assert_eq!(state.carried_role(0), (Role::Unknown, 0));

        let unknown = PollState::default();
        assert_eq!(unknown.carried_role(5), (Role::Unknown, 0));
    }
}
