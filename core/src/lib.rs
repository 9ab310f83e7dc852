// Pulse Core Library
// Data backend for the pNode network dashboard

pub mod api;
pub mod prpc;
pub mod stats;
pub mod store;
pub mod types;

// Export core types
pub use prpc::{NodeSource, PrpcClient, PrpcConfig};
pub use stats::{PollerConfig, StatsPoller};
pub use store::{NetworkDb, StatsDb};
pub use types::{Activity, ActivityKind, NetworkSummary, PNode, StatSample};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("all pRPC seeds failed")]
    SeedsExhausted,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PulseError>;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_millis(0))
        .as_millis() as i64
}
