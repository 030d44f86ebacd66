//! Cluster role and member topology.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Leadership status of the polled member as reported by etcd.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// No self-status has been read yet (or it is too old to trust).
    #[default]
    Unknown,
    Leader,
    Follower,
}

impl Role {
    /// Value of the `state` field reported by a leader.
    pub const LEADER_STATE: &'static str = "StateLeader";

    /// Role from the `state` field of `/v2/stats/self`.
    ///
    /// Anything other than `StateLeader` is a follower.
    pub fn from_state(state: &str) -> Self {
        if state == Self::LEADER_STATE {
            Role::Leader
        } else {
            Role::Follower
        }
    }

    /// Role from a `/v2/stats/self` payload. `None` if there is no `state` field.
    pub fn from_self_stats(payload: &Value) -> Option<Self> {
        payload
            .get("state")
            .and_then(Value::as_str)
            .map(Self::from_state)
    }

    /// Name used for the `state` dimension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unknown => "StateUnknown",
            Role::Leader => "StateLeader",
            Role::Follower => "StateFollower",
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One member from `/v2/members`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNode {
    pub member_id: String,
    pub client_url: String,
}

/// Member id to client URL mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    nodes: HashMap<String, String>,
}

impl Topology {
    /// Build the topology from a `/v2/members` payload.
    ///
    /// Members without an id or without any client URL are skipped. Returns
    /// `None` when the payload has no `members` list.
    pub fn from_members(payload: &Value) -> Option<Self> {
        let members = payload.get("members")?.as_array()?;

        let nodes = members
            .iter()
            .filter_map(|member| {
                let member_id = member.get("id")?.as_str()?;
                let client_url = member.get("clientURLs")?.as_array()?.first()?.as_str()?;
                Some(ClusterNode {
                    member_id: member_id.to_string(),
                    client_url: client_url.to_string(),
                })
            })
            .collect::<Vec<_>>();

        Some(Self::from_nodes(nodes))
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = ClusterNode>) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|node| (node.member_id, node.client_url))
                .collect(),
        }
    }

    pub fn client_url(&self, member_id: &str) -> Option<&str> {
        self.nodes.get(member_id).map(String::as_str)
    }

    /// Short name for a follower: its client URL without the scheme.
    ///
    /// Falls back to the member id when the member is not in the topology.
    pub fn display_name(&self, member_id: &str) -> String {
        match self.client_url(member_id) {
            Some(url) => strip_scheme(url).to_string(),
            None => member_id.to_string(),
        }
    }
}

fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}
