//! Remote ledger query client boundary.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::model::{
    ListEnvironmentsRequest, ListEnvironmentsResponse, ListProvidersRequest,
    ListProvidersResponse, ShowEnvironmentRequest, ShowEnvironmentResponse, ShowProviderRequest,
    ShowProviderResponse,
};

/// Failure of a single remote query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The ledger answered with a non-OK status.
    #[error("ledger status {code}: {message}")]
    Status { code: String, message: String },

    /// The per-call timeout elapsed.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller abandoned the invocation.
    #[error("call cancelled")]
    Cancelled,
}

impl LedgerError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn status(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Read-only query surface of the ledger.
///
/// Implementations are shared across concurrent calls and must not assume
/// any ordering between them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    async fn list_providers(
        &self,
        req: ListProvidersRequest,
    ) -> Result<ListProvidersResponse, LedgerError>;

    async fn show_provider(
        &self,
        req: ShowProviderRequest,
    ) -> Result<ShowProviderResponse, LedgerError>;

    async fn list_environments(
        &self,
        req: ListEnvironmentsRequest,
    ) -> Result<ListEnvironmentsResponse, LedgerError>;

    async fn show_environment(
        &self,
        req: ShowEnvironmentRequest,
    ) -> Result<ShowEnvironmentResponse, LedgerError>;
}
