use std::sync::Arc;

use pulse_core::api::{ApiConfig, ApiServer, ApiState};
use pulse_core::prpc::{NodeSource, PrpcClient, PrpcConfig};
use pulse_core::stats::{PollerConfig, StatsPoller};
use pulse_core::store::StatsDb;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source: Arc<dyn NodeSource> = Arc::new(PrpcClient::with_config(PrpcConfig::from_env()));
    let db = StatsDb::from_env();

    let poller = Arc::new(StatsPoller::new(
        source.clone(),
        db.clone(),
        PollerConfig::from_env(),
    ));
    poller.clone().spawn();

    let api_config = ApiConfig::from_env();
    tracing::info!(
        host = %api_config.host,
        port = api_config.port,
        "Starting Pulse dashboard server"
    );

    let state = ApiState { source, db, poller };
    let server = ApiServer::new(api_config, state);

    server.serve().await?;

    Ok(())
}
