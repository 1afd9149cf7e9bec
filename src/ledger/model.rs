//! Ledger query wire model.
//!
//! Mirrors the ledger's query RPC messages. Field names are snake_case on the
//! wire; every struct tolerates missing fields so sparse payloads decode.

use serde::{Deserialize, Serialize};

/// Pagination descriptor sent with list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

/// Pagination summary returned with list results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key: Option<String>,
    pub total: u64,
}

/// Free-form entity metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
    /// JSON-encoded annotation map, kept verbatim.
    pub annotations: String,
}

/// A compute provider registered on the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
    pub id: u64,
    pub creator: String,
    pub name: String,
    pub ip: String,
    pub port: u32,
    pub country_code: String,
    pub environment_type: String,
    pub availability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// An environment hosted by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub id: u64,
    pub creator: String,
    pub provider: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListProvidersRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub pagination: PageRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListProvidersResponse {
    pub providers: Vec<Provider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowProviderRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowProviderResponse {
    pub provider: Option<Provider>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListEnvironmentsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub pagination: PageRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListEnvironmentsResponse {
    pub environments: Vec<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowEnvironmentRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowEnvironmentResponse {
    pub environment: Option<Environment>,
}

/// What a ledger response carries, for not-found detection and logging.
pub trait LedgerResponse {
    /// False when a single-entity lookup came back empty.
    fn has_entity(&self) -> bool {
        true
    }

    /// Number of entities carried.
    fn entity_count(&self) -> usize;
}

impl LedgerResponse for ListProvidersResponse {
    fn entity_count(&self) -> usize {
        self.providers.len()
    }
}

impl LedgerResponse for ListEnvironmentsResponse {
    fn entity_count(&self) -> usize {
        self.environments.len()
    }
}

impl LedgerResponse for ShowProviderResponse {
    fn has_entity(&self) -> bool {
        self.provider.is_some()
    }

    fn entity_count(&self) -> usize {
        usize::from(self.has_entity())
    }
}

impl LedgerResponse for ShowEnvironmentResponse {
    fn has_entity(&self) -> bool {
        self.environment.is_some()
    }

    fn entity_count(&self) -> usize {
        usize::from(self.has_entity())
    }
}
