//! Request orchestrator: one remote call under a deadline and a circuit breaker.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::outcome::{Failure, RemoteOutcome};
use crate::breaker::{BreakerError, CircuitBreaker};
use crate::ledger::{LedgerError, LedgerQuery, LedgerResponse};

/// Runs ledger calls for one tool family.
///
/// Exactly one remote call per `execute`; retries are the caller's business.
#[derive(Clone)]
pub struct QueryOrchestrator {
    ledger: Option<Arc<dyn LedgerQuery>>,
    timeout: Duration,
    breaker: Arc<CircuitBreaker>,
}

impl fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("ledger", &self.ledger.is_some())
            .field("timeout", &self.timeout)
            .field("breaker", &self.breaker.name())
            .finish()
    }
}

impl QueryOrchestrator {
    pub fn new(
        ledger: Option<Arc<dyn LedgerQuery>>,
        timeout: Duration,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            ledger,
            timeout,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_ledger(&self) -> bool {
        self.ledger.is_some()
    }

    /// Run `call` against the ledger under the per-call timeout and the
    /// family breaker.
    ///
    /// The timeout is independent of `cancel`; cancelling aborts the
    /// in-flight call, which then counts as one breaker failure.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, call: F) -> RemoteOutcome<T>
    where
        T: LedgerResponse,
        F: FnOnce(Arc<dyn LedgerQuery>) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let Some(ledger) = self.ledger.clone() else {
            tracing::error!("Ledger client is not available");
            return RemoteOutcome::Failed(Failure::Unavailable);
        };

        let timeout = self.timeout;
        let guarded = async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LedgerError::Cancelled),
                result = tokio::time::timeout(timeout, call(ledger)) => {
                    result.unwrap_or(Err(LedgerError::DeadlineExceeded(timeout)))
                }
            }
        };

        match self.breaker.call(guarded).await {
            Ok(response) if !response.has_entity() => RemoteOutcome::NotFound,
            Ok(response) => RemoteOutcome::Found(response),
            Err(BreakerError::Open) => RemoteOutcome::Failed(Failure::BreakerOpen),
            Err(err @ BreakerError::TooManyRequests) => {
                RemoteOutcome::Failed(Failure::Upstream(err.to_string()))
            }
            Err(BreakerError::Inner(err)) => RemoteOutcome::Failed(Failure::Upstream(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{BreakerSettings, BreakerState};
    use crate::ledger::{
        ListEnvironmentsRequest, ListEnvironmentsResponse, ListProvidersRequest,
        ListProvidersResponse, MockLedgerQuery, Provider, ShowEnvironmentRequest,
        ShowEnvironmentResponse, ShowProviderRequest, ShowProviderResponse,
    };
    use async_trait::async_trait;

    fn breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(BreakerSettings::new("test")))
    }

    fn orchestrator(ledger: impl LedgerQuery + 'static) -> QueryOrchestrator {
        QueryOrchestrator::new(Some(Arc::new(ledger)), Duration::from_secs(30), breaker())
    }

    async fn show(orch: &QueryOrchestrator, id: u64) -> RemoteOutcome<ShowProviderResponse> {
        orch.execute(&CancellationToken::new(), move |ledger| async move {
            ledger.show_provider(ShowProviderRequest { id }).await
        })
        .await
    }

    /// Ledger whose provider lookups never answer before `delay`.
    struct SlowLedger {
        delay: Duration,
    }

    #[async_trait]
    impl LedgerQuery for SlowLedger {
        async fn list_providers(
            &self,
            _req: ListProvidersRequest,
        ) -> Result<ListProvidersResponse, LedgerError> {
            tokio::time::sleep(self.delay).await;
            Ok(ListProvidersResponse::default())
        }

        async fn show_provider(
            &self,
            _req: ShowProviderRequest,
        ) -> Result<ShowProviderResponse, LedgerError> {
            tokio::time::sleep(self.delay).await;
            Ok(ShowProviderResponse::default())
        }

        async fn list_environments(
            &self,
            _req: ListEnvironmentsRequest,
        ) -> Result<ListEnvironmentsResponse, LedgerError> {
            Ok(ListEnvironmentsResponse::default())
        }

        async fn show_environment(
            &self,
            _req: ShowEnvironmentRequest,
        ) -> Result<ShowEnvironmentResponse, LedgerError> {
            Ok(ShowEnvironmentResponse::default())
        }
    }

    #[tokio::test]
    async fn test_missing_ledger_is_unavailable_without_breaker() {
        let orch = QueryOrchestrator::new(None, Duration::from_secs(30), breaker());
        let outcome = show(&orch, 1).await;

        assert_eq!(outcome, RemoteOutcome::Failed(Failure::Unavailable));
        assert_eq!(orch.breaker().counts().requests, 0);
    }

    #[tokio::test]
    async fn test_found() {
        let mut mock = MockLedgerQuery::new();
        mock.expect_show_provider()
            .withf(|req| req.id == 7)
            .times(1)
            .returning(|req| {
                Ok(ShowProviderResponse {
                    provider: Some(Provider {
                        id: req.id,
                        ..Default::default()
                    }),
                })
            });

        let outcome = show(&orchestrator(mock), 7).await;
        match outcome {
            RemoteOutcome::Found(resp) => assert_eq!(resp.provider.unwrap().id, 7),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_entity_is_not_found() {
        let mut mock = MockLedgerQuery::new();
        mock.expect_show_provider()
            .returning(|_| Ok(ShowProviderResponse::default()));

        let orch = orchestrator(mock);
        assert_eq!(show(&orch, 999).await, RemoteOutcome::NotFound);
        // Not-found is a successful call as far as the breaker is concerned.
        assert_eq!(orch.breaker().counts().total_successes, 1);
    }

    #[tokio::test]
    async fn test_remote_error_is_upstream_and_counted() {
        let mut mock = MockLedgerQuery::new();
        mock.expect_show_provider()
            .returning(|_| Err(LedgerError::transport("connection refused")));

        let orch = orchestrator(mock);
        let outcome = show(&orch, 1).await;

        assert_eq!(
            outcome,
            RemoteOutcome::Failed(Failure::Upstream(
                "transport error: connection refused".to_string()
            ))
        );
        assert_eq!(orch.breaker().counts().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_breaker_opens_and_stops_remote_calls() {
        let mut mock = MockLedgerQuery::new();
        mock.expect_show_provider()
            .times(3)
            .returning(|_| Err(LedgerError::status("Unavailable", "node down")));

        let orch = orchestrator(mock);
        for _ in 0..3 {
            assert!(matches!(
                show(&orch, 1).await,
                RemoteOutcome::Failed(Failure::Upstream(_))
            ));
        }
        assert_eq!(orch.breaker().state(), BreakerState::Open);

        // times(3) fails the test if this reaches the ledger.
        assert_eq!(show(&orch, 1).await, RemoteOutcome::Failed(Failure::BreakerOpen));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_upstream() {
        let orch = QueryOrchestrator::new(
            Some(Arc::new(SlowLedger {
                delay: Duration::from_secs(120),
            })),
            Duration::from_secs(5),
            breaker(),
        );

        let outcome = show(&orch, 1).await;
        match outcome {
            RemoteOutcome::Failed(Failure::Upstream(detail)) => {
                assert!(detail.contains("deadline exceeded"), "{detail}")
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(orch.breaker().counts().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_call() {
        let orch = QueryOrchestrator::new(
            Some(Arc::new(SlowLedger {
                delay: Duration::from_secs(120),
            })),
            Duration::from_secs(60),
            breaker(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome: RemoteOutcome<ShowProviderResponse> = orch
            .execute(&cancel, |ledger| async move {
                ledger.show_provider(ShowProviderRequest { id: 1 }).await
            })
            .await;

        assert_eq!(
            outcome,
            RemoteOutcome::Failed(Failure::Upstream("call cancelled".to_string()))
        );
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(orch.breaker().counts().total_failures, 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_returns_promptly() {
        let mut mock = MockLedgerQuery::new();
        mock.expect_show_provider().never();

        let orch = orchestrator(mock);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome: RemoteOutcome<ShowProviderResponse> = orch
            .execute(&cancel, |ledger| async move {
                ledger.show_provider(ShowProviderRequest { id: 1 }).await
            })
            .await;
        assert!(matches!(outcome, RemoteOutcome::Failed(Failure::Upstream(_))));
    }
}
