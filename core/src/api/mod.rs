// HTTP API module - read-only JSON endpoints for the dashboard UI

mod server;

pub use server::{router, ApiServer, ApiState};

/// API server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("PULSE_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PULSE_API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}
