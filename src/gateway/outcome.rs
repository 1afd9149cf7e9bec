//! Classified result of one guarded ledger call.

/// Why a guarded call produced no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No ledger handle configured.
    Unavailable,
    /// The family's circuit breaker rejected the call.
    BreakerOpen,
    /// The call ran (or was refused mid-probe) and failed. The detail is for
    /// logs only.
    Upstream(String),
}

/// Outcome of one attempt to query the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<T> {
    Found(T),
    /// The ledger answered, but the requested entity is absent.
    NotFound,
    Failed(Failure),
}
