use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:13855";
pub const DEFAULT_UPSTREAM_ADDR: &str = "127.0.0.1:13854";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Relay configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Where WebSocket clients connect
    pub bind_addr: SocketAddr,
    /// Telemetry server every pairing connects to
    pub upstream_addr: String,
    /// Upper bound on the upstream connect per pairing
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 13855)),
            upstream_addr: DEFAULT_UPSTREAM_ADDR.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup("FOCUS_RELAY_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("FOCUS_RELAY_BIND={}", bind)))?;

        let upstream_addr =
            lookup("FOCUS_RELAY_UPSTREAM").unwrap_or_else(|| DEFAULT_UPSTREAM_ADDR.to_string());
        if !upstream_addr.contains(':') {
            return Err(ConfigError::InvalidValue(format!(
                "FOCUS_RELAY_UPSTREAM must be host:port, got {}",
                upstream_addr
            )));
        }

        let connect_timeout = match lookup("FOCUS_RELAY_CONNECT_TIMEOUT_SECS") {
            Some(value) => value.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("FOCUS_RELAY_CONNECT_TIMEOUT_SECS={}", value))
            })?,
            None => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        Ok(Self {
            bind_addr,
            upstream_addr,
            connect_timeout: Duration::from_secs(connect_timeout),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
