// Domain types for the dashboard backend
//
// Field casing mirrors the JSON the dashboard UI already consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Liveness classification for a pNode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Online,
    Offline,
    Syncing,
    Warning,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Online => "Online",
            NodeStatus::Offline => "Offline",
            NodeStatus::Syncing => "Syncing",
            NodeStatus::Warning => "Warning",
        };
        f.write_str(name)
    }
}

/// Geolocation shown on the world map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeLocation {
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<f64>,
}

/// One participant node as shown in the dashboard table and map.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PNode {
    pub id: String,
    pub ip: String,
    pub port: u16,
    pub status: NodeStatus,
    pub version: String,
    pub location: NodeLocation,
    pub last_seen: DateTime<Utc>,
    pub performance: f64,
    pub availability: f64,
    pub at_risk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<NodeStats>,
}

/// Per-node resource statistics.
///
/// Field names are snake_case except `nodeId`, matching the upstream API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeStats {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<u32>,
    pub disk_usage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_committed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_out: Option<u64>,
    pub uptime: u64,
    pub last_sync: DateTime<Utc>,
}

/// Share of the fleet running one software version.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VersionShare {
    pub version: String,
    pub percent: f64,
}

/// Per-country node rollup for the map overlay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStat {
    pub country: String,
    pub node_count: u32,
    pub online: u32,
    pub healthy: u32,
}

/// Network-wide health summary derived from one node inventory.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub total_nodes: u32,
    pub online_percent: f64,
    pub countries: usize,
    pub at_risk_count: u32,
    pub composite_score: u32,
    pub availability_score: f64,
    pub version_health: u32,
    pub distribution_score: u32,
    pub versions: Vec<VersionShare>,
    pub locations: Vec<CountryStat>,
}

impl NetworkSummary {
    /// Derive the summary for a node inventory.
    pub fn from_nodes(nodes: &[PNode]) -> Self {
        let total_nodes = nodes.len() as u32;
        let online = nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Online)
            .count();
        let online_percent = if nodes.is_empty() {
            0.0
        } else {
            online as f64 / nodes.len() as f64 * 100.0
        };

        let countries = nodes
            .iter()
            .map(|n| n.location.country.as_str())
            .collect::<HashSet<_>>()
            .len();

        let availability_score =
            nodes.iter().map(|n| n.availability).sum::<f64>() / nodes.len().max(1) as f64;

        let mut version_counts: HashMap<&str, usize> = HashMap::new();
        for node in nodes {
            if !node.version.is_empty() {
                *version_counts.entry(node.version.as_str()).or_insert(0) += 1;
            }
        }
        let mut versions: Vec<VersionShare> = version_counts
            .into_iter()
            .map(|(version, count)| VersionShare {
                version: version.to_string(),
                percent: count as f64 / total_nodes as f64 * 100.0,
            })
            .collect();
        versions.sort_by(|a, b| {
            b.percent
                .partial_cmp(&a.percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.version.cmp(&b.version))
        });

        // A fleet fragmented into slivers (any version below 10%) is flagged
        let version_health = if versions.iter().all(|v| v.percent > 10.0) {
            90
        } else {
            60
        };
        let distribution_score = if countries > 5 { 90 } else { 40 };
        let at_risk_count = nodes.iter().filter(|n| n.at_risk).count() as u32;

        let mut location_map: HashMap<&str, CountryStat> = HashMap::new();
        for node in nodes {
            let entry = location_map
                .entry(node.location.country.as_str())
                .or_insert_with(|| CountryStat {
                    country: node.location.country.clone(),
                    node_count: 0,
                    online: 0,
                    healthy: 0,
                });
            entry.node_count += 1;
            if node.status == NodeStatus::Online {
                entry.online += 1;
                if !node.at_risk {
                    entry.healthy += 1;
                }
            }
        }
        let mut locations: Vec<CountryStat> = location_map.into_values().collect();
        locations.sort_by(|a, b| {
            b.node_count
                .cmp(&a.node_count)
                .then(a.country.cmp(&b.country))
        });

        let composite_score = (0.4 * online_percent
            + 0.3 * availability_score
            + 0.2 * version_health as f64
            + 0.1 * distribution_score as f64)
            .round() as u32;

        Self {
            total_nodes,
            online_percent,
            countries,
            at_risk_count,
            composite_score,
            availability_score,
            version_health,
            distribution_score,
            versions,
            locations,
        }
    }
}

/// One aggregate statistics sample, recorded per poll cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSample {
    pub timestamp: i64,
    pub total_nodes: u32,
    pub online_nodes: u32,
    pub score: u32,
}

/// Severity of an activity log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One entry in the network activity feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub msg: String,
    #[serde(rename = "nodeId", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub time: i64,
}

impl Activity {
    /// Create an entry stamped with a fresh id and the current time.
    pub fn new(kind: ActivityKind, msg: impl Into<String>, node_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            msg: msg.into(),
            node_id,
            time: crate::now_ms(),
        }
    }
}
