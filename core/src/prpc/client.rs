// JSON-RPC client for the pRPC service
//
// Every call walks the seed list in order; a failing seed falls through to
// the next, and only when all seeds are exhausted does the call fail.

use super::{NodeSource, PrpcConfig};
use crate::types::{NodeLocation, NodeStats, NodeStatus, PNode};
use crate::{PulseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// A node is online if it reported in within this many seconds.
const ONLINE_WINDOW_SECS: i64 = 300;

// Placeholder geolocation tables, indexed by first IP octet modulo 8.
// Deterministic so the map stays stable across polls until the upstream
// service reports real coordinates.
const COUNTRY_CODES: [&str; 8] = ["USA", "DE", "JP", "SG", "UK", "BR", "AU", "CA"];
const LATITUDES: [f64; 8] = [37.0, 51.0, 36.0, 1.0, 55.0, -14.0, -25.0, 56.0];
const LONGITUDES: [f64; 8] = [-95.0, 10.0, 138.0, 103.0, -3.0, -51.0, 133.0, -106.0];

/// Raw pod record as returned by `getPodsWithStats`.
#[derive(Debug, Deserialize)]
struct RawPod {
    pubkey: String,
    address: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    last_seen_timestamp: i64,
    #[serde(default)]
    uptime: u64,
    #[serde(default)]
    storage_used: u64,
    #[serde(default)]
    storage_committed: u64,
}

#[derive(Debug, Deserialize)]
struct PodsResponse {
    pods: Vec<RawPod>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client for the network's pRPC service.
pub struct PrpcClient {
    config: PrpcConfig,
    http_client: reqwest::Client,
}

impl PrpcClient {
    /// Create a client with the default seed list.
    pub fn new() -> Self {
        Self::with_config(PrpcConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: PrpcConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    /// Call `method` against each seed in order until one answers.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        for seed in &self.config.seeds {
            let url = format!("http://{}:{}/", seed, self.config.rpc_port);
            match self.call_seed(&url, method, params.clone()).await {
                Ok(value) => {
                    debug!(target: "prpc", seed = %seed, method = %method, "RPC call ok");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(target: "prpc", seed = %seed, method = %method, error = %e, "Seed failed, trying next");
                }
            }
        }

        Err(PulseError::SeedsExhausted)
    }

    async fn call_seed<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PulseError::RpcError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PulseError::RpcError(format!(
                "seed returned status {}",
                response.status()
            )));
        }

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| PulseError::RpcError(format!("invalid response: {}", e)))?;

        if let Some(err) = envelope.error {
            return Err(PulseError::RpcError(format!(
                "{} (code {})",
                err.message, err.code
            )));
        }

        envelope
            .result
            .ok_or_else(|| PulseError::RpcError("empty result".to_string()))
    }
}

impl Default for PrpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeSource for PrpcClient {
    async fn pnodes(&self) -> Result<Vec<PNode>> {
        let response: PodsResponse = self.call("getPodsWithStats", json!([])).await?;
        let now = Utc::now();
        debug!(target: "prpc", count = response.pods.len(), "Fetched pod inventory");

        Ok(response
            .pods
            .into_iter()
            .map(|raw| map_raw_pod(raw, now))
            .collect())
    }

    async fn node_stats(&self, node_id: &str) -> Result<NodeStats> {
        self.call("getStats", json!([node_id])).await
    }
}

/// Map a raw pod record into the dashboard's node shape.
fn map_raw_pod(raw: RawPod, now: DateTime<Utc>) -> PNode {
    let (ip, port) = match raw.address.split_once(':') {
        Some((ip, port)) => (ip.to_string(), port.parse().unwrap_or(0)),
        None => (raw.address.clone(), 0),
    };

    let status = if now.timestamp() - raw.last_seen_timestamp < ONLINE_WINDOW_SECS {
        NodeStatus::Online
    } else {
        NodeStatus::Offline
    };

    let first_octet: usize = ip
        .split('.')
        .next()
        .and_then(|octet| octet.parse().ok())
        .unwrap_or(0);
    let idx = first_octet % COUNTRY_CODES.len();

    let mut rng = rand::thread_rng();

    PNode {
        id: raw.pubkey.clone(),
        ip,
        port,
        status,
        version: raw.version,
        location: NodeLocation {
            country: COUNTRY_CODES[idx].to_string(),
            lat: Some(LATITUDES[idx]),
            long: Some(LONGITUDES[idx]),
        },
        last_seen: DateTime::from_timestamp(raw.last_seen_timestamp, 0).unwrap_or(now),
        // Placeholders until the upstream service reports these
        performance: 100.0,
        availability: 99.9,
        at_risk: false,
        stats: Some(NodeStats {
            node_id: raw.pubkey,
            cpu_usage: Some(rng.gen_range(10..50)),
            memory_usage: Some(rng.gen_range(20..80)),
            disk_usage: raw.storage_used,
            storage_committed: Some(raw.storage_committed),
            bandwidth_in: Some(0),
            bandwidth_out: Some(0),
            uptime: raw.uptime,
            last_sync: now,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_pod(address: &str, last_seen: i64) -> RawPod {
        RawPod {
            pubkey: "pod-1".to_string(),
            address: address.to_string(),
            version: "0.5.1".to_string(),
            last_seen_timestamp: last_seen,
            uptime: 3600,
            storage_used: 1024,
            storage_committed: 4096,
        }
    }

    #[test]
    fn test_online_window() {
        let now = Utc::now();

        let fresh = map_raw_pod(raw_pod("1.2.3.4:5000", now.timestamp() - 60), now);
        assert_eq!(fresh.status, NodeStatus::Online);

        let stale = map_raw_pod(raw_pod("1.2.3.4:5000", now.timestamp() - 600), now);
        assert_eq!(stale.status, NodeStatus::Offline);
    }

    #[test]
    fn test_address_parsing() {
        let now = Utc::now();

        let node = map_raw_pod(raw_pod("192.190.136.36:9001", now.timestamp()), now);
        assert_eq!(node.ip, "192.190.136.36");
        assert_eq!(node.port, 9001);

        // No port falls back to 0 rather than failing the whole inventory
        let node = map_raw_pod(raw_pod("192.190.136.36", now.timestamp()), now);
        assert_eq!(node.ip, "192.190.136.36");
        assert_eq!(node.port, 0);
    }

    #[test]
    fn test_location_is_deterministic() {
        let now = Utc::now();

        // 161 % 8 == 1 -> second entry of the tables
        let node = map_raw_pod(raw_pod("161.97.97.41:6000", now.timestamp()), now);
        assert_eq!(node.location.country, "DE");
        assert_eq!(node.location.lat, Some(51.0));

        let again = map_raw_pod(raw_pod("161.97.97.41:6000", now.timestamp()), now);
        assert_eq!(again.location.country, node.location.country);
    }

    #[test]
    fn test_stats_carry_storage_fields() {
        let now = Utc::now();
        let node = map_raw_pod(raw_pod("1.2.3.4:5000", now.timestamp()), now);
        let stats = node.stats.unwrap();
        assert_eq!(stats.disk_usage, 1024);
        assert_eq!(stats.storage_committed, Some(4096));
        assert_eq!(stats.uptime, 3600);
    }
}
