//! Gateway: the four ledger tools behind validation, breakers and mapping.
//!
//! ```text
//!   call_tool(name, params)
//!        │
//!        ▼
//!   tools::validate ──► ValidatedRequest
//!        │
//!        ▼
//!   QueryOrchestrator (per family: timeout + CircuitBreaker + LedgerQuery)
//!        │
//!        ▼
//!   mapper::render ──► ToolResult
//! ```

pub mod mapper;
pub mod orchestrator;
pub mod outcome;

pub use mapper::{
    not_found_message, render, ToolResult, BREAKER_OPEN_MESSAGE, UNAVAILABLE_MESSAGE,
    UPSTREAM_MESSAGE,
};
pub use orchestrator::QueryOrchestrator;
pub use outcome::{Failure, RemoteOutcome};

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::breaker::{BreakerSettings, CircuitBreaker};
use crate::ledger::{
    LedgerError, LedgerQuery, LedgerResponse, ListEnvironmentsRequest, ListProvidersRequest,
    PageRequest, ShowEnvironmentRequest, ShowProviderRequest,
};
use crate::tools::{
    self, EntityQuery, ListQuery, ToolCatalog, ToolFamily, ToolName, ToolParameters,
    ValidatedRequest,
};
use crate::types::{BreakerConfig, CallId, GatewayConfig, Result};

/// Tool entry point. Cheap to clone; clones share breakers and the ledger.
#[derive(Debug, Clone)]
pub struct LedgerGateway {
    providers: QueryOrchestrator,
    environments: QueryOrchestrator,
    catalog: Arc<ToolCatalog>,
}

impl LedgerGateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Circuit breaker guarding `family`.
    pub fn breaker(&self, family: ToolFamily) -> &Arc<CircuitBreaker> {
        self.orchestrator(family).breaker()
    }

    fn orchestrator(&self, family: ToolFamily) -> &QueryOrchestrator {
        match family {
            ToolFamily::Providers => &self.providers,
            ToolFamily::Environments => &self.environments,
        }
    }

    /// Invoke a tool by name with untyped arguments.
    ///
    /// Errors only for an unknown tool, invalid arguments, or a payload that
    /// cannot be encoded. Ledger trouble comes back as an `Ok` text result.
    pub async fn call_tool(
        &self,
        name: &str,
        params: Option<&ToolParameters>,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        let tool: ToolName = name.parse()?;
        let request = tools::validate(tool, params)?;
        self.execute(request, cancel).await
    }

    /// Run an already validated request.
    pub async fn execute(
        &self,
        request: ValidatedRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        match request {
            ValidatedRequest::ListProviders(q) => self.list_providers(q, cancel).await,
            ValidatedRequest::ShowProvider(q) => self.show_provider(q, cancel).await,
            ValidatedRequest::ListEnvironments(q) => self.list_environments(q, cancel).await,
            ValidatedRequest::ShowEnvironment(q) => self.show_environment(q, cancel).await,
        }
    }

    pub async fn list_providers(
        &self,
        query: ListQuery,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        let req = ListProvidersRequest {
            creator: query.creator().map(str::to_string),
            pagination: page(&query),
        };
        self.run(ToolName::ListProviders, None, req.clone(), cancel, |ledger| async move {
            ledger.list_providers(req).await
        })
        .await
    }

    pub async fn show_provider(
        &self,
        query: EntityQuery,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        let req = ShowProviderRequest { id: query.id() };
        self.run(ToolName::ShowProvider, Some(req.id), req, cancel, |ledger| async move {
            ledger.show_provider(req).await
        })
        .await
    }

    pub async fn list_environments(
        &self,
        query: ListQuery,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        let req = ListEnvironmentsRequest {
            creator: query.creator().map(str::to_string),
            pagination: page(&query),
        };
        self.run(ToolName::ListEnvironments, None, req.clone(), cancel, |ledger| async move {
            ledger.list_environments(req).await
        })
        .await
    }

    pub async fn show_environment(
        &self,
        query: EntityQuery,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        let req = ShowEnvironmentRequest { id: query.id() };
        self.run(ToolName::ShowEnvironment, Some(req.id), req, cancel, |ledger| async move {
            ledger.show_environment(req).await
        })
        .await
    }

    async fn run<Req, T, F, Fut>(
        &self,
        tool: ToolName,
        id: Option<u64>,
        request: Req,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<ToolResult>
    where
        Req: fmt::Debug,
        T: LedgerResponse + Serialize,
        F: FnOnce(Arc<dyn LedgerQuery>) -> Fut,
        Fut: Future<Output = std::result::Result<T, LedgerError>>,
    {
        let family = tool.family();
        let call_id = CallId::new();
        let span = tracing::info_span!("tool_call", tool = %tool, call_id = %call_id);

        async move {
            tracing::info!("Processing {} request", tool);
            tracing::debug!(request = ?request, "Ledger request");

            let started = Instant::now();
            let outcome = self.orchestrator(family).execute(cancel, call).await;
            if let RemoteOutcome::Found(response) = &outcome {
                tracing::info!(
                    count = response.entity_count(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Ledger query succeeded"
                );
            }
            render(outcome, family, id)
        }
        .instrument(span)
        .await
    }
}

fn page(query: &ListQuery) -> PageRequest {
    PageRequest {
        limit: query.limit(),
        offset: query.offset(),
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`LedgerGateway`].
///
/// Without a ledger every tool answers with the unavailable sentence.
/// Breakers not supplied explicitly are built from the breaker config.
#[derive(Default)]
pub struct GatewayBuilder {
    ledger: Option<Arc<dyn LedgerQuery>>,
    timeout: Option<Duration>,
    breaker_config: BreakerConfig,
    providers_breaker: Option<Arc<CircuitBreaker>>,
    environments_breaker: Option<Arc<CircuitBreaker>>,
}

impl fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("ledger", &self.ledger.is_some())
            .field("timeout", &self.timeout)
            .field("breaker_config", &self.breaker_config)
            .finish()
    }
}

impl GatewayBuilder {
    /// Start from loaded configuration (timeout and breaker thresholds).
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            timeout: Some(config.ledger.api_timeout),
            breaker_config: config.breaker.clone(),
            ..Self::default()
        }
    }

    pub fn ledger(mut self, ledger: Arc<dyn LedgerQuery>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set or clear the ledger; `None` when the dependency could not be
    /// reached at startup.
    pub fn maybe_ledger(mut self, ledger: Option<Arc<dyn LedgerQuery>>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn breaker_config(mut self, config: BreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Use a specific breaker for `family`.
    pub fn breaker(mut self, family: ToolFamily, breaker: Arc<CircuitBreaker>) -> Self {
        match family {
            ToolFamily::Providers => self.providers_breaker = Some(breaker),
            ToolFamily::Environments => self.environments_breaker = Some(breaker),
        }
        self
    }

    pub fn build(self) -> LedgerGateway {
        let timeout = self
            .timeout
            .unwrap_or_else(|| GatewayConfig::default().ledger.api_timeout);
        let config = &self.breaker_config;
        let default_breaker = |family: ToolFamily| {
            Arc::new(CircuitBreaker::new(BreakerSettings::from_config(
                family.breaker_name(),
                config,
            )))
        };

        let providers = self
            .providers_breaker
            .unwrap_or_else(|| default_breaker(ToolFamily::Providers));
        let environments = self
            .environments_breaker
            .unwrap_or_else(|| default_breaker(ToolFamily::Environments));

        tracing::debug!(
            ledger = self.ledger.is_some(),
            timeout = ?timeout,
            "Ledger gateway built"
        );

        LedgerGateway {
            providers: QueryOrchestrator::new(self.ledger.clone(), timeout, providers),
            environments: QueryOrchestrator::new(self.ledger, timeout, environments),
            catalog: Arc::new(ToolCatalog::standard()),
        }
    }
}
