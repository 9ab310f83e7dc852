// In-memory backend for development and testing

use super::{DbBackend, NetworkDb};
use crate::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Holds the document in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    db: RwLock<Option<NetworkDb>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DbBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<NetworkDb>> {
        Ok(self.db.read().await.clone())
    }

    async fn store(&self, db: &NetworkDb) -> Result<()> {
        *self.db.write().await = Some(db.clone());
        Ok(())
    }
}
