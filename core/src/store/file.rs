// Local JSON file backend

use super::{DbBackend, NetworkDb};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Stores the document as pretty-printed JSON on the local filesystem.
///
/// Used when no key-value service is configured (local development and
/// single-box deployments).
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DbBackend for FileBackend {
    async fn load(&self) -> Result<Option<NetworkDb>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read(&self.path).await?;
        let db = serde_json::from_slice(&data)?;
        Ok(Some(db))
    }

    async fn store(&self, db: &NetworkDb) -> Result<()> {
        let data = serde_json::to_vec_pretty(db)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatSample;

    #[tokio::test]
    async fn test_missing_file_reads_as_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("network_stats.json"));

        assert!(backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("network_stats.json"));

        let db = NetworkDb {
            stats: vec![StatSample {
                timestamp: 1_700_000_000_000,
                total_nodes: 200,
                online_nodes: 180,
                score: 90,
            }],
            logs: Vec::new(),
        };
        backend.store(&db).await.unwrap();

        let loaded = backend.load().await.unwrap().unwrap();
        assert_eq!(loaded.stats, db.stats);
        assert!(loaded.logs.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network_stats.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let backend = FileBackend::new(&path);
        assert!(backend.load().await.is_err());
    }
}
