// Poll-and-diff task
//
// Fetches the node inventory on a fixed interval, persists one stat sample
// per cycle, and turns snapshot differences into activity log entries.

use crate::prpc::NodeSource;
use crate::store::StatsDb;
use crate::types::{Activity, ActivityKind, NetworkSummary, NodeStatus, PNode, StatSample};
use crate::{now_ms, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Above this many events of one kind in a single cycle, one aggregate
/// entry replaces the per-node entries.
const BULK_EVENT_THRESHOLD: usize = 3;

/// Poller configuration.
#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl PollerConfig {
    pub fn from_env() -> Self {
        let secs = std::env::var("PULSE_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        Self {
            interval: Duration::from_secs(secs),
        }
    }
}

/// Node id -> last observed status, as of one poll cycle.
type Snapshot = HashMap<String, NodeStatus>;

/// Differences between two consecutive snapshots.
#[derive(Debug, Default)]
struct SnapshotDiff {
    joined: Vec<String>,
    disconnected: Vec<String>,
    status_changes: Vec<(String, NodeStatus)>,
}

/// Owns the polling loop: the node source, the store, and the snapshot of
/// the previous cycle. Holds no process-global state; construct one per
/// deployment and share it behind an `Arc`.
pub struct StatsPoller {
    source: Arc<dyn NodeSource>,
    db: StatsDb,
    config: PollerConfig,
    last_snapshot: RwLock<Option<Snapshot>>,
    in_flight: AtomicBool,
}

impl StatsPoller {
    pub fn new(source: Arc<dyn NodeSource>, db: StatsDb, config: PollerConfig) -> Self {
        Self {
            source,
            db,
            config,
            last_snapshot: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run poll cycles forever on the configured interval. The first tick
    /// fires immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            target: "poller",
            interval_secs = self.config.interval.as_secs(),
            "Starting network stats poller"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(target: "poller", error = %e, "Poll cycle failed");
                }
            }
        })
    }

    /// Run one poll cycle.
    ///
    /// Skips (returning Ok) when another cycle is already in flight, so an
    /// overlapping timer tick or a concurrent manual trigger never runs
    /// two cycles at once.
    pub async fn run_once(&self) -> Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!(target: "poller", "Previous poll cycle still running, skipping");
            return Ok(());
        }

        let result = self.cycle().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn cycle(&self) -> Result<()> {
        let nodes = self.source.pnodes().await?;
        let summary = NetworkSummary::from_nodes(&nodes);

        info!(
            target: "poller",
            nodes = nodes.len(),
            online_percent = summary.online_percent,
            "Fetched network snapshot"
        );

        let online_nodes =
            ((summary.online_percent / 100.0) * summary.total_nodes as f64).round() as u32;
        self.db
            .record_sample(StatSample {
                timestamp: now_ms(),
                total_nodes: summary.total_nodes,
                online_nodes,
                score: summary.composite_score,
            })
            .await;

        let current: Snapshot = nodes.iter().map(|n| (n.id.clone(), n.status)).collect();

        // First cycle after start has nothing to diff against; logging it
        // would spam "new node" for the whole network.
        let mut last = self.last_snapshot.write().await;
        if let Some(prev) = last.as_ref() {
            let diff = diff_snapshots(prev, &nodes);
            let entries = activities_for(&diff);
            if !entries.is_empty() {
                info!(target: "poller", entries = entries.len(), "Recording node activity");
            }
            self.db.record_activities(entries).await;
        }
        *last = Some(current);

        Ok(())
    }
}

/// Classify every node as joined, disconnected, or status-changed between
/// two consecutive snapshots.
fn diff_snapshots(prev: &Snapshot, current: &[PNode]) -> SnapshotDiff {
    let mut diff = SnapshotDiff::default();

    for node in current {
        match prev.get(&node.id) {
            None => diff.joined.push(node.id.clone()),
            Some(prev_status) if *prev_status != node.status => {
                diff.status_changes.push((node.id.clone(), node.status));
            }
            Some(_) => {}
        }
    }

    let current_ids: HashSet<&str> = current.iter().map(|n| n.id.as_str()).collect();
    let mut disconnected: Vec<String> = prev
        .keys()
        .filter(|id| !current_ids.contains(id.as_str()))
        .cloned()
        .collect();
    disconnected.sort();
    diff.disconnected = disconnected;

    diff
}

/// Turn a snapshot diff into activity entries, collapsing any category
/// with more than `BULK_EVENT_THRESHOLD` events into one aggregate entry.
fn activities_for(diff: &SnapshotDiff) -> Vec<Activity> {
    let mut entries = Vec::new();

    if diff.joined.len() > BULK_EVENT_THRESHOLD {
        entries.push(Activity::new(
            ActivityKind::Success,
            format!("{} new pNodes joined the network", diff.joined.len()),
            None,
        ));
    } else {
        for id in &diff.joined {
            entries.push(Activity::new(
                ActivityKind::Success,
                "New pNode joined the network",
                Some(id.clone()),
            ));
        }
    }

    if diff.status_changes.len() > BULK_EVENT_THRESHOLD {
        let online = diff
            .status_changes
            .iter()
            .filter(|(_, status)| *status == NodeStatus::Online)
            .count();
        entries.push(Activity::new(
            ActivityKind::Info,
            format!("Bulk status update: {} Online", online),
            None,
        ));
    } else {
        for (id, status) in &diff.status_changes {
            let kind = if *status == NodeStatus::Online {
                ActivityKind::Success
            } else {
                ActivityKind::Warning
            };
            entries.push(Activity::new(
                kind,
                format!("Node status changed to {}", status),
                Some(id.clone()),
            ));
        }
    }

    if diff.disconnected.len() > BULK_EVENT_THRESHOLD {
        entries.push(Activity::new(
            ActivityKind::Error,
            format!("{} pNodes disconnected", diff.disconnected.len()),
            None,
        ));
    } else {
        for id in &diff.disconnected {
            entries.push(Activity::new(
                ActivityKind::Error,
                "pNode disconnected from network",
                Some(id.clone()),
            ));
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeLocation;
    use chrono::Utc;

    fn node(id: &str, status: NodeStatus) -> PNode {
        PNode {
            id: id.to_string(),
            ip: "10.0.0.1".to_string(),
            port: 5000,
            status,
            version: "1.0.0".to_string(),
            location: NodeLocation {
                country: "DE".to_string(),
                lat: None,
                long: None,
            },
            last_seen: Utc::now(),
            performance: 100.0,
            availability: 99.9,
            at_risk: false,
            stats: None,
        }
    }

    fn snapshot(ids: &[(&str, NodeStatus)]) -> Snapshot {
        ids.iter()
            .map(|(id, status)| (id.to_string(), *status))
            .collect()
    }

    #[test]
    fn test_diff_join_and_disconnect() {
        let prev = snapshot(&[
            ("a", NodeStatus::Online),
            ("b", NodeStatus::Online),
            ("c", NodeStatus::Online),
        ]);
        let current = vec![
            node("b", NodeStatus::Online),
            node("c", NodeStatus::Online),
            node("d", NodeStatus::Online),
        ];

        let diff = diff_snapshots(&prev, &current);
        assert_eq!(diff.joined, vec!["d".to_string()]);
        assert_eq!(diff.disconnected, vec!["a".to_string()]);
        assert!(diff.status_changes.is_empty());
    }

    #[test]
    fn test_diff_status_change() {
        let prev = snapshot(&[("a", NodeStatus::Online), ("b", NodeStatus::Online)]);
        let current = vec![node("a", NodeStatus::Offline), node("b", NodeStatus::Online)];

        let diff = diff_snapshots(&prev, &current);
        assert!(diff.joined.is_empty());
        assert!(diff.disconnected.is_empty());
        assert_eq!(
            diff.status_changes,
            vec![("a".to_string(), NodeStatus::Offline)]
        );
    }

    #[test]
    fn test_few_joins_log_per_node() {
        let diff = SnapshotDiff {
            joined: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };

        let entries = activities_for(&diff);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == ActivityKind::Success));
        assert_eq!(entries[0].node_id.as_deref(), Some("a"));
        assert_eq!(entries[0].msg, "New pNode joined the network");
    }

    #[test]
    fn test_many_joins_collapse_to_one_entry() {
        let diff = SnapshotDiff {
            joined: (0..5).map(|i| format!("n{}", i)).collect(),
            ..Default::default()
        };

        let entries = activities_for(&diff);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].msg, "5 new pNodes joined the network");
        assert_eq!(entries[0].node_id, None);
    }

    #[test]
    fn test_bulk_status_update_counts_online() {
        let diff = SnapshotDiff {
            status_changes: vec![
                ("a".to_string(), NodeStatus::Online),
                ("b".to_string(), NodeStatus::Online),
                ("c".to_string(), NodeStatus::Offline),
                ("d".to_string(), NodeStatus::Online),
            ],
            ..Default::default()
        };

        let entries = activities_for(&diff);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ActivityKind::Info);
        assert_eq!(entries[0].msg, "Bulk status update: 3 Online");
    }

    #[test]
    fn test_status_change_severity() {
        let diff = SnapshotDiff {
            status_changes: vec![
                ("a".to_string(), NodeStatus::Online),
                ("b".to_string(), NodeStatus::Offline),
            ],
            ..Default::default()
        };

        let entries = activities_for(&diff);
        assert_eq!(entries[0].kind, ActivityKind::Success);
        assert_eq!(entries[0].msg, "Node status changed to Online");
        assert_eq!(entries[1].kind, ActivityKind::Warning);
        assert_eq!(entries[1].msg, "Node status changed to Offline");
    }

    #[test]
    fn test_disconnect_entries() {
        let diff = SnapshotDiff {
            disconnected: vec!["a".to_string()],
            ..Default::default()
        };

        let entries = activities_for(&diff);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ActivityKind::Error);
        assert_eq!(entries[0].msg, "pNode disconnected from network");

        let bulk = SnapshotDiff {
            disconnected: (0..6).map(|i| format!("n{}", i)).collect(),
            ..Default::default()
        };
        let entries = activities_for(&bulk);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].msg, "6 pNodes disconnected");
    }
}
