//! Status document published on `<key_prefix>/@/status`.

use serde::{Deserialize, Serialize};

use crate::config::EtcdConfig;

pub const BRIDGE_NAME: &str = "etcd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    Running,
    Offline,
}

/// The member a running bridge polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolledMember {
    pub member: String,
    pub cluster: String,
    pub poll_interval_secs: u64,
    pub enhanced_metrics: bool,
}

impl PolledMember {
    pub fn from_config(config: &EtcdConfig) -> Self {
        Self {
            member: config.member_id(),
            cluster: config.cluster.clone(),
            poll_interval_secs: config.poll_interval_secs,
            enhanced_metrics: config.enhanced_metrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub bridge: String,
    pub version: String,
    pub status: BridgeState,
    /// Only set while running.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub polled: Option<PolledMember>,
}

impl BridgeStatus {
    pub fn running(polled: PolledMember) -> Self {
        Self {
            bridge: BRIDGE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: BridgeState::Running,
            polled: Some(polled),
        }
    }

    pub fn offline() -> Self {
        Self {
            bridge: BRIDGE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: BridgeState::Offline,
            polled: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EtcdBridgeConfig;

    #[test]
    fn test_running_status() {
        let config = EtcdBridgeConfig::parse(
            r#"{ etcd: { host: "10.0.0.1", port: 2379, cluster: "prod", enhanced_metrics: true } }"#,
        )
        .unwrap();
        let status = BridgeStatus::running(PolledMember::from_config(&config.etcd));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["bridge"], "etcd");
        assert_eq!(json["status"], "running");
        assert_eq!(json["member"], "10.0.0.1:2379");
        assert_eq!(json["cluster"], "prod");
        assert_eq!(json["poll_interval_secs"], 10);
        assert_eq!(json["enhanced_metrics"], true);
    }

    #[test]
    fn test_offline_status() {
        let json = serde_json::to_value(BridgeStatus::offline()).unwrap();
        assert_eq!(json["status"], "offline");
        assert!(json.get("member").is_none());
    }
}
