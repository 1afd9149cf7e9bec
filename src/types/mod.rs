//! Core types for the ledger gateway.
//!
//! - **IDs**: per-call correlation identifiers
//! - **Errors**: application error types with thiserror derives
//! - **Config**: configuration structures loaded from the environment

mod config;
mod errors;
mod ids;

pub use config::{
    BreakerConfig, GatewayConfig, LedgerConfig, ObservabilityConfig, ServerConfig,
    ENV_API_TIMEOUT, ENV_DEBUG, ENV_GRPC_URL, ENV_HTTP_ADDR, ENV_LOG_FORMAT,
};
pub use errors::{Error, Result};
pub use ids::CallId;
