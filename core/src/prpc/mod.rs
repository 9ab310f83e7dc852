// pRPC client module
//
// Node inventory and per-node statistics from the storage network's RPC
// service, fetched through an ordered list of seed nodes.

mod client;

pub use client::PrpcClient;

use crate::types::{NodeStats, PNode};
use crate::Result;
use async_trait::async_trait;

/// Source of node inventory and per-node statistics.
///
/// The poller and the HTTP API depend on this seam rather than on the
/// concrete client so tests can substitute a scripted network.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetch the full node inventory.
    async fn pnodes(&self) -> Result<Vec<PNode>>;

    /// Fetch statistics for a single node.
    async fn node_stats(&self, node_id: &str) -> Result<NodeStats>;
}

/// Well-known seed nodes used when none are configured.
pub const DEFAULT_SEEDS: [&str; 8] = [
    "173.212.220.65",
    "161.97.97.41",
    "192.190.136.36",
    "192.190.136.38",
    "207.244.255.1",
    "192.190.136.28",
    "192.190.136.29",
    "173.212.203.145",
];

/// Configuration for the pRPC client.
#[derive(Clone, Debug)]
pub struct PrpcConfig {
    /// Seed addresses, tried in order until one answers.
    pub seeds: Vec<String>,
    /// RPC port exposed by every seed.
    pub rpc_port: u16,
    /// Timeout for RPC requests in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PrpcConfig {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            rpc_port: 6000,
            timeout_ms: 10_000,
        }
    }
}

impl PrpcConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let seeds = std::env::var("PULSE_SEEDS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|seeds| !seeds.is_empty())
            .unwrap_or(defaults.seeds);

        Self {
            seeds,
            rpc_port: std::env::var("PULSE_PRPC_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.rpc_port),
            timeout_ms: std::env::var("PULSE_PRPC_TIMEOUT_MS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_ms),
        }
    }
}
