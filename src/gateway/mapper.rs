//! Result mapper: turns a [`RemoteOutcome`] into the text handed back to the
//! caller.
//!
//! Only a payload that cannot be encoded becomes an error. Every ledger-side
//! degradation is reported as an ordinary result carrying a fixed sentence.

use serde::{Deserialize, Serialize};

use super::outcome::{Failure, RemoteOutcome};
use crate::tools::ToolFamily;
use crate::types::Result;

/// Returned when no ledger handle is configured.
pub const UNAVAILABLE_MESSAGE: &str = "Error: ledger dependency not available. The gRPC \
     connection to the blockchain is not configured or unreachable. Please check the \
     connection and try again.";

/// Returned while the family breaker is open.
pub const BREAKER_OPEN_MESSAGE: &str =
    "Blockchain service is temporarily unavailable (circuit open). Please try again later.";

/// Returned for any failed remote call. The cause is logged, never returned.
pub const UPSTREAM_MESSAGE: &str = "Unable to connect to blockchain service. The service may \
     be temporarily unavailable. Please check your connection and try again later.";

/// Uniform tool result: one text payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    text: String,
}

impl ToolResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// `"Provider with ID '999' not found."`
pub fn not_found_message(kind: &str, id: u64) -> String {
    format!("{kind} with ID '{id}' not found.")
}

/// Map one outcome to its result.
///
/// `id` is the requested identifier for single-entity tools; listing tools
/// never produce `NotFound`.
pub fn render<T: Serialize>(
    outcome: RemoteOutcome<T>,
    family: ToolFamily,
    id: Option<u64>,
) -> Result<ToolResult> {
    let text = match outcome {
        RemoteOutcome::Found(payload) => serde_json::to_string_pretty(&payload)?,
        RemoteOutcome::NotFound => {
            let kind = family.entity_kind();
            match id {
                Some(id) => not_found_message(kind, id),
                None => format!("No {kind} data returned."),
            }
        }
        RemoteOutcome::Failed(Failure::Unavailable) => UNAVAILABLE_MESSAGE.to_string(),
        RemoteOutcome::Failed(Failure::BreakerOpen) => BREAKER_OPEN_MESSAGE.to_string(),
        RemoteOutcome::Failed(Failure::Upstream(detail)) => {
            tracing::warn!(
                breaker = family.breaker_name(),
                error = %detail,
                "Ledger call failed"
            );
            UPSTREAM_MESSAGE.to_string()
        }
    };
    Ok(ToolResult::new(text))
}
