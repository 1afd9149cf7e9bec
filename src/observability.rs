//! Observability utilities.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::ObservabilityConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Default filter directive when `RUST_LOG` is unset.
pub fn default_directive(config: &ObservabilityConfig) -> &'static str {
    if config.debug {
        "debug"
    } else {
        "info"
    }
}

/// Initialize tracing subscriber once for the process.
///
/// `RUST_LOG` wins when set; otherwise the filter is `debug` with `DEBUG=true`
/// and `info` without. Output is compact text unless JSON logs are enabled.
pub fn init_tracing(config: &ObservabilityConfig) {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

        let result = if config.json_logs {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        let config = ObservabilityConfig::default();
        init_tracing(&config);
        init_tracing(&config);
    }

    #[test]
    fn debug_flag_lowers_default_filter() {
        let mut config = ObservabilityConfig::default();
        assert_eq!(default_directive(&config), "info");
        config.debug = true;
        assert_eq!(default_directive(&config), "debug");
    }
}
