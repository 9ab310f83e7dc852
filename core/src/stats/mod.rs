// Statistics pipeline: poll the network, diff snapshots, aggregate history

pub mod history;
mod poller;

pub use history::aggregate_hourly;
pub use poller::{PollerConfig, StatsPoller};
