//! Configuration structures.
//!
//! Configuration is loaded from environment variables. Loading never fails on
//! a malformed timeout (a warning is logged and the default kept); `validate`
//! rejects configurations the gateway cannot run with.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Error, Result};

/// Ledger gRPC endpoint.
pub const ENV_GRPC_URL: &str = "OVERLOCK_GRPC_URL";
/// Per-call timeout, humantime format (`30s`, `1500ms`).
pub const ENV_API_TIMEOUT: &str = "OVERLOCK_API_TIMEOUT";
/// Tool listener address (consumed by the transport, carried here).
pub const ENV_HTTP_ADDR: &str = "MCP_HTTP_ADDR";
/// `true` enables debug logging.
pub const ENV_DEBUG: &str = "DEBUG";
/// `json` switches log output to JSON lines.
pub const ENV_LOG_FORMAT: &str = "LEDGER_GATEWAY_LOG_FORMAT";

/// Global gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GatewayConfig {
    /// Remote ledger connection.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Listener configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Circuit breaker thresholds shared by every tool family.
    #[serde(default)]
    pub breaker: BreakerConfig,
}

/// Remote ledger connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// gRPC endpoint of the ledger query service.
    pub grpc_url: String,

    /// Upper bound for every remote call.
    #[serde(with = "humantime_serde")]
    pub api_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            grpc_url: "localhost:9090".to_string(),
            api_timeout: Duration::from_secs(30),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Tool-invocation listener bind address.
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ObservabilityConfig {
    /// Lower the default log filter to `debug`.
    pub debug: bool,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakerConfig {
    /// Trial calls admitted while half-open; the same number of consecutive
    /// successes closes the breaker.
    pub max_requests: u32,

    /// Rolling window after which closed-state counts are cleared.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Cooldown spent open before probing.
    #[serde(with = "humantime_serde")]
    pub open_timeout: Duration,

    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            interval: Duration::from_secs(30),
            open_timeout: Duration::from_secs(60),
            failure_threshold: 3,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_GRPC_URL).filter(|v| !v.is_empty()) {
            config.ledger.grpc_url = url;
        }

        if let Some(raw) = lookup(ENV_API_TIMEOUT).filter(|v| !v.is_empty()) {
            match humantime_serde::re::humantime::parse_duration(&raw) {
                Ok(timeout) => config.ledger.api_timeout = timeout,
                Err(err) => tracing::warn!(
                    value = %raw,
                    default = ?config.ledger.api_timeout,
                    error = %err,
                    "Invalid {}, using default",
                    ENV_API_TIMEOUT
                ),
            }
        }

        if let Some(addr) = lookup(ENV_HTTP_ADDR).filter(|v| !v.is_empty()) {
            config.server.http_addr = addr;
        }

        config.observability.debug = lookup(ENV_DEBUG).as_deref() == Some("true");
        config.observability.json_logs = lookup(ENV_LOG_FORMAT)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.ledger.grpc_url.is_empty() {
            return Err(Error::config(format!("{ENV_GRPC_URL} is required")));
        }
        if self.server.http_addr.is_empty() {
            return Err(Error::config(format!("{ENV_HTTP_ADDR} is required")));
        }
        if self.ledger.api_timeout.is_zero() {
            return Err(Error::config(format!("{ENV_API_TIMEOUT} must be positive")));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(Error::config("breaker failure_threshold must be positive"));
        }
        Ok(())
    }
}
