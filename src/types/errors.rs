//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Only the
//! variants here ever reach a tool caller as a hard error; ledger degradation
//! is folded into text results by the gateway instead.

use crate::tools::ValidationError;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the ledger gateway.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied tool parameters violated the tool's schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Tool name not present in the catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A ledger payload could not be encoded. Indicates a defect, not an
    /// operational condition.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors (fixture loading).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by the caller's input rather than the gateway.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::UnknownTool(_))
    }
}
