// Remote key-value backend
//
// Speaks the REST protocol of the hosted key-value service the dashboard
// deploys with: `GET {url}/get/{key}`, `POST {url}/set/{key}`, bearer-token
// auth. Values are stored as JSON strings under a single document key.

use super::{DbBackend, NetworkDb, DB_KEY};
use crate::{PulseError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the key-value backend.
#[derive(Clone, Debug)]
pub struct KvConfig {
    pub url: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl KvConfig {
    /// Present only when `PULSE_KV_REST_API_URL` is set; its presence is
    /// what selects this backend over the local file.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("PULSE_KV_REST_API_URL").ok()?;
        Some(Self {
            url,
            token: std::env::var("PULSE_KV_REST_API_TOKEN").unwrap_or_default(),
            timeout_ms: 10_000,
        })
    }
}

/// `GET /get/{key}` response envelope.
#[derive(Debug, Deserialize)]
struct GetResponse {
    result: Option<String>,
}

pub struct KvBackend {
    config: KvConfig,
    http_client: reqwest::Client,
}

impl KvBackend {
    pub fn new(config: KvConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    fn endpoint(&self, op: &str) -> String {
        format!("{}/{}/{}", self.config.url.trim_end_matches('/'), op, DB_KEY)
    }
}

#[async_trait]
impl DbBackend for KvBackend {
    async fn load(&self) -> Result<Option<NetworkDb>> {
        let response = self
            .http_client
            .get(self.endpoint("get"))
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| PulseError::StorageError(format!("KV get failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PulseError::StorageError(format!(
                "KV get returned status {}",
                response.status()
            )));
        }

        let body: GetResponse = response
            .json()
            .await
            .map_err(|e| PulseError::StorageError(format!("KV get returned invalid JSON: {}", e)))?;

        match body.result {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, db: &NetworkDb) -> Result<()> {
        let payload = serde_json::to_string(db)?;

        let response = self
            .http_client
            .post(self.endpoint("set"))
            .bearer_auth(&self.config.token)
            .body(payload)
            .send()
            .await
            .map_err(|e| PulseError::StorageError(format!("KV set failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PulseError::StorageError(format!(
                "KV set returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
