//! In-memory ledger backed by a JSON fixture document.
//!
//! Answers queries the way the ledger does: creator filtering first, then
//! offset/limit paging, and an empty response for unknown ids.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::client::{LedgerError, LedgerQuery};
use super::model::{
    Environment, ListEnvironmentsRequest, ListEnvironmentsResponse, ListProvidersRequest,
    ListProvidersResponse, PageRequest, PageResponse, Provider, ShowEnvironmentRequest,
    ShowEnvironmentResponse, ShowProviderRequest, ShowProviderResponse,
};
use crate::types::Result;

/// Fixture document: `{"providers": [...], "environments": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    pub providers: Vec<Provider>,
    pub environments: Vec<Environment>,
}

/// Ledger answering from fixture data.
#[derive(Debug, Clone, Default)]
pub struct FixtureLedger {
    data: FixtureData,
}

impl FixtureLedger {
    pub fn new(data: FixtureData) -> Self {
        Self { data }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded ledger fixture");
        Self::from_json_str(&raw)
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }
}

fn page<T: Clone>(
    items: &[T],
    creator_of: impl Fn(&T) -> &str,
    creator: Option<&str>,
    pagination: PageRequest,
) -> (Vec<T>, PageResponse) {
    let matching: Vec<&T> = items
        .iter()
        .filter(|item| creator.map_or(true, |c| creator_of(item) == c))
        .collect();

    let offset = usize::try_from(pagination.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(pagination.limit).unwrap_or(usize::MAX);
    let paged = matching
        .iter()
        .skip(offset)
        .take(limit)
        .map(|item| (*item).clone())
        .collect();

    let summary = PageResponse {
        next_key: None,
        total: matching.len() as u64,
    };
    (paged, summary)
}

#[async_trait]
impl LedgerQuery for FixtureLedger {
    async fn list_providers(
        &self,
        req: ListProvidersRequest,
    ) -> std::result::Result<ListProvidersResponse, LedgerError> {
        let (providers, summary) = page(
            &self.data.providers,
            |p| p.creator.as_str(),
            req.creator.as_deref(),
            req.pagination,
        );
        Ok(ListProvidersResponse {
            providers,
            pagination: Some(summary),
        })
    }

    async fn show_provider(
        &self,
        req: ShowProviderRequest,
    ) -> std::result::Result<ShowProviderResponse, LedgerError> {
        Ok(ShowProviderResponse {
            provider: self.data.providers.iter().find(|p| p.id == req.id).cloned(),
        })
    }

    async fn list_environments(
        &self,
        req: ListEnvironmentsRequest,
    ) -> std::result::Result<ListEnvironmentsResponse, LedgerError> {
        let (environments, summary) = page(
            &self.data.environments,
            |e| e.creator.as_str(),
            req.creator.as_deref(),
            req.pagination,
        );
        Ok(ListEnvironmentsResponse {
            environments,
            pagination: Some(summary),
        })
    }

    async fn show_environment(
        &self,
        req: ShowEnvironmentRequest,
    ) -> std::result::Result<ShowEnvironmentResponse, LedgerError> {
        Ok(ShowEnvironmentResponse {
            environment: self.data.environments.iter().find(|e| e.id == req.id).cloned(),
        })
    }
}
