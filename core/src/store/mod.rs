// Persistence layer for dashboard statistics
//
// One small JSON document with two bounded collections, held in a remote
// key-value service, a local file, or process memory. Every domain
// operation is best-effort: a broken store never aborts a poll cycle or a
// request handler.

mod file;
mod kv;
mod memory;

pub use file::FileBackend;
pub use kv::{KvBackend, KvConfig};
pub use memory::MemoryBackend;

use crate::stats::history::aggregate_hourly;
use crate::types::{Activity, StatSample};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Stat samples retained (one per poll cycle, oldest first).
const MAX_STAT_SAMPLES: usize = 1000;
/// Activity entries retained (newest first).
const MAX_ACTIVITY_ENTRIES: usize = 100;

/// Document key used by the key-value backend.
pub(crate) const DB_KEY: &str = "network_stats";

/// The persisted document: bounded stats series plus activity log.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NetworkDb {
    #[serde(default)]
    pub stats: Vec<StatSample>,
    #[serde(default)]
    pub logs: Vec<Activity>,
}

/// Raw document storage.
#[async_trait]
pub trait DbBackend: Send + Sync {
    /// Load the document. `Ok(None)` means nothing has been stored yet.
    async fn load(&self) -> Result<Option<NetworkDb>>;

    /// Store the document, replacing any previous version.
    async fn store(&self, db: &NetworkDb) -> Result<()>;
}

/// Domain operations over the persisted document.
///
/// Reads that fail yield the empty document; writes that fail are logged
/// and dropped. There is no transaction or optimistic-concurrency guard:
/// read-modify-write assumes a single writing instance.
#[derive(Clone)]
pub struct StatsDb {
    backend: Arc<dyn DbBackend>,
}

impl StatsDb {
    pub fn new(backend: Arc<dyn DbBackend>) -> Self {
        Self { backend }
    }

    /// Select a backend from the environment: the key-value service when
    /// `PULSE_KV_REST_API_URL` is set, a local JSON file otherwise.
    pub fn from_env() -> Self {
        if let Some(config) = KvConfig::from_env() {
            info!(target: "store", url = %config.url, "Using key-value backend");
            Self::new(Arc::new(KvBackend::new(config)))
        } else {
            let path = std::env::var("PULSE_DB_PATH")
                .unwrap_or_else(|_| "network_stats.json".to_string());
            info!(target: "store", path = %path, "Using local file backend");
            Self::new(Arc::new(FileBackend::new(path)))
        }
    }

    /// Load the document, falling back to the empty document on failure.
    pub async fn read(&self) -> NetworkDb {
        match self.backend.load().await {
            Ok(Some(db)) => db,
            Ok(None) => NetworkDb::default(),
            Err(e) => {
                error!(target: "store", error = %e, "Failed to read stats document");
                NetworkDb::default()
            }
        }
    }

    async fn write(&self, db: &NetworkDb) {
        if let Err(e) = self.backend.store(db).await {
            error!(target: "store", error = %e, "Failed to write stats document");
        }
    }

    /// Append one poll sample, keeping the last `MAX_STAT_SAMPLES`.
    pub async fn record_sample(&self, sample: StatSample) {
        let mut db = self.read().await;
        db.stats.push(sample);
        if db.stats.len() > MAX_STAT_SAMPLES {
            let excess = db.stats.len() - MAX_STAT_SAMPLES;
            db.stats.drain(0..excess);
        }
        self.write(&db).await;
    }

    /// Prepend activity entries, keeping the first `MAX_ACTIVITY_ENTRIES`.
    ///
    /// Entries are given in emission order; the last emitted ends up on
    /// top of the feed.
    pub async fn record_activities(&self, entries: Vec<Activity>) {
        if entries.is_empty() {
            return;
        }
        let mut db = self.read().await;
        for entry in entries {
            db.logs.insert(0, entry);
        }
        db.logs.truncate(MAX_ACTIVITY_ENTRIES);
        self.write(&db).await;
    }

    /// Prepend a single activity entry.
    pub async fn record_activity(&self, entry: Activity) {
        self.record_activities(vec![entry]).await;
    }

    /// The newest `limit` activity entries.
    pub async fn recent_activity(&self, limit: usize) -> Vec<Activity> {
        let db = self.read().await;
        db.logs.into_iter().take(limit).collect()
    }

    /// Hourly aggregates over the last `hours` hours.
    pub async fn historical_stats(&self, hours: i64) -> Vec<StatSample> {
        let db = self.read().await;
        aggregate_hourly(&db.stats, hours, crate::now_ms())
    }

    /// Replace the whole document. Used by the seed-history tool.
    pub async fn replace(&self, db: &NetworkDb) {
        self.write(db).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityKind;
    use crate::PulseError;

    struct FailingBackend;

    #[async_trait]
    impl DbBackend for FailingBackend {
        async fn load(&self) -> Result<Option<NetworkDb>> {
            Err(PulseError::StorageError("backend down".to_string()))
        }

        async fn store(&self, _db: &NetworkDb) -> Result<()> {
            Err(PulseError::StorageError("backend down".to_string()))
        }
    }

    fn sample(ts: i64) -> StatSample {
        StatSample {
            timestamp: ts,
            total_nodes: 10,
            online_nodes: 9,
            score: 90,
        }
    }

    #[tokio::test]
    async fn test_samples_bounded_and_ordered() {
        let db = StatsDb::new(Arc::new(MemoryBackend::new()));

        for i in 0..1050 {
            db.record_sample(sample(i)).await;
        }

        let stored = db.read().await;
        assert_eq!(stored.stats.len(), 1000);
        // Oldest entries dropped, insertion order preserved
        assert_eq!(stored.stats.first().unwrap().timestamp, 50);
        assert_eq!(stored.stats.last().unwrap().timestamp, 1049);
    }

    #[tokio::test]
    async fn test_activity_bounded_newest_first() {
        let db = StatsDb::new(Arc::new(MemoryBackend::new()));

        for i in 0..120 {
            db.record_activity(Activity::new(
                ActivityKind::Info,
                format!("event {}", i),
                None,
            ))
            .await;
        }

        let logs = db.read().await.logs;
        assert_eq!(logs.len(), 100);
        assert_eq!(logs.first().unwrap().msg, "event 119");
        assert_eq!(logs.last().unwrap().msg, "event 20");
    }

    #[tokio::test]
    async fn test_batch_activity_order_matches_sequential() {
        let batched = StatsDb::new(Arc::new(MemoryBackend::new()));
        batched
            .record_activities(vec![
                Activity::new(ActivityKind::Info, "first", None),
                Activity::new(ActivityKind::Info, "second", None),
            ])
            .await;

        let logs = batched.read().await.logs;
        assert_eq!(logs[0].msg, "second");
        assert_eq!(logs[1].msg, "first");
    }

    #[tokio::test]
    async fn test_recent_activity_limit() {
        let db = StatsDb::new(Arc::new(MemoryBackend::new()));
        for i in 0..10 {
            db.record_activity(Activity::new(ActivityKind::Info, format!("e{}", i), None))
                .await;
        }

        let recent = db.recent_activity(3).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].msg, "e9");
    }

    #[tokio::test]
    async fn test_read_failure_yields_empty_document() {
        let db = StatsDb::new(Arc::new(FailingBackend));
        let stored = db.read().await;
        assert!(stored.stats.is_empty());
        assert!(stored.logs.is_empty());

        // Writes are swallowed, not propagated
        db.record_sample(sample(1)).await;
        db.record_activity(Activity::new(ActivityKind::Error, "e", None))
            .await;
    }
}
