//! # Ledger Gateway - resilient read-only ledger tools
//!
//! Exposes four query tools over a remote ledger:
//! - `list-providers` / `show-provider`
//! - `list-environments` / `show-environment`
//!
//! Each call is validated, guarded by a per-family circuit breaker, bounded
//! by a fixed timeout, and mapped to a single text result. Ledger outages
//! degrade to explanatory text; only bad input is reported as an error.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────────────┐
//!   tool call     →  │            LedgerGateway             │
//!                    │  ┌──────────┐   ┌─────────────────┐  │
//!                    │  │  params  │ → │  Orchestrator   │  │
//!                    │  │ validate │   │ timeout+breaker │  │
//!                    │  └──────────┘   └────────┬────────┘  │
//!                    │  ┌──────────┐            │           │
//!   ToolResult    ←  │  │  mapper  │ ←──────────┘           │
//!                    │  └──────────┘                        │
//!                    └──────────────────┬───────────────────┘
//!                                       │ LedgerQuery
//!                                       ▼
//!                               remote ledger / fixture
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod breaker;
pub mod gateway;
pub mod ledger;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use gateway::{GatewayBuilder, LedgerGateway, ToolResult};
pub use types::{Error, GatewayConfig, Result};
