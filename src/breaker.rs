//! Circuit breaker guarding the remote ledger.
//!
//! Three-state machine, one instance per tool family:
//!
//! ```text
//! Closed   → Open:     consecutive failures reach the threshold
//! Open     → HalfOpen: cooldown (open_timeout) elapsed
//! HalfOpen → Closed:   max_requests consecutive trial successes
//! HalfOpen → Open:     any trial failure
//! ```
//!
//! While closed, counts are cleared every `interval`. Every state change
//! starts a new generation; outcomes of calls admitted under an older
//! generation are discarded. All state sits behind one mutex that is never
//! held across an await point.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::types::BreakerConfig;

// =============================================================================
// State & counts
// =============================================================================

/// Breaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    HalfOpen,
    Open,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BreakerState::Closed => "closed",
            BreakerState::HalfOpen => "half-open",
            BreakerState::Open => "open",
        })
    }
}

/// Request and outcome counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    fn clear(&mut self) {
        *self = Counts::default();
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Callback invoked on every state change with (name, from, to).
pub type StateObserver = Arc<dyn Fn(&str, BreakerState, BreakerState) + Send + Sync>;

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSettings {
    pub name: String,
    /// Trial calls admitted while half-open, and the consecutive successes
    /// needed to close again.
    pub max_requests: u32,
    /// Closed-state counts are cleared after this long. Zero disables.
    pub interval: Duration,
    /// Time spent open before probing.
    pub open_timeout: Duration,
    /// Consecutive failures that trip a closed breaker.
    pub failure_threshold: u32,
}

impl BreakerSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(name, &BreakerConfig::default())
    }

    pub fn from_config(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self {
            name: name.into(),
            max_requests: config.max_requests.max(1),
            interval: config.interval,
            open_timeout: config.open_timeout,
            failure_threshold: config.failure_threshold.max(1),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Why a guarded call did not produce a value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BreakerError<E> {
    /// Breaker open; the call was not attempted.
    #[error("circuit breaker is open")]
    Open,

    /// Half-open trial budget exhausted; the call was not attempted.
    #[error("too many requests while circuit breaker is half-open")]
    TooManyRequests,

    /// The call ran and failed.
    #[error("{0}")]
    Inner(E),
}

/// Admission refused before running a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Open,
    TooManyRequests,
}

impl<E> From<Rejection> for BreakerError<E> {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::Open => BreakerError::Open,
            Rejection::TooManyRequests => BreakerError::TooManyRequests,
        }
    }
}

// =============================================================================
// Breaker
// =============================================================================

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

type Transition = (BreakerState, BreakerState);

/// Thread-safe circuit breaker. Share it with `Arc`.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<Inner>,
    observer: Option<StateObserver>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("settings", &self.settings)
            .field("inner", &self.inner)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        let now = Instant::now();
        let expiry = closed_expiry(&settings, now);
        Self {
            settings,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
            observer: None,
        }
    }

    /// Attach a state-change observer (in addition to the warning log).
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Current state, applying any transition that is due.
    pub fn state(&self) -> BreakerState {
        let mut transitions = Vec::new();
        let state = {
            let mut inner = self.lock();
            self.current_state(&mut inner, Instant::now(), &mut transitions);
            inner.state
        };
        self.emit(&transitions);
        state
    }

    /// Counts of the current generation.
    pub fn counts(&self) -> Counts {
        self.lock().counts
    }

    /// Run `call` if the breaker admits it and record its outcome.
    ///
    /// If the returned future is dropped before `call` completes, the call
    /// is recorded as a failure.
    pub async fn call<F, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let generation = self.before_request()?;
        let mut in_flight = InFlight {
            breaker: self,
            generation,
            settled: false,
        };

        let result = call.await;
        in_flight.settle(result.is_ok());
        result.map_err(BreakerError::Inner)
    }

    fn before_request(&self) -> Result<u64, Rejection> {
        let mut transitions = Vec::new();
        let admitted = {
            let mut inner = self.lock();
            let now = Instant::now();
            self.current_state(&mut inner, now, &mut transitions);

            match inner.state {
                BreakerState::Open => Err(Rejection::Open),
                BreakerState::HalfOpen if inner.counts.requests >= self.settings.max_requests => {
                    Err(Rejection::TooManyRequests)
                }
                _ => {
                    inner.counts.on_request();
                    Ok(inner.generation)
                }
            }
        };
        self.emit(&transitions);
        admitted
    }

    fn after_request(&self, generation: u64, success: bool) {
        let mut transitions = Vec::new();
        {
            let mut inner = self.lock();
            let now = Instant::now();
            self.current_state(&mut inner, now, &mut transitions);
            if inner.generation == generation {
                if success {
                    self.on_success(&mut inner, now, &mut transitions);
                } else {
                    self.on_failure(&mut inner, now, &mut transitions);
                }
            }
        }
        self.emit(&transitions);
    }

    fn on_success(&self, inner: &mut Inner, now: Instant, transitions: &mut Vec<Transition>) {
        match inner.state {
            BreakerState::Closed => inner.counts.on_success(),
            BreakerState::HalfOpen => {
                inner.counts.on_success();
                if inner.counts.consecutive_successes >= self.settings.max_requests {
                    self.set_state(inner, BreakerState::Closed, now, transitions);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn on_failure(&self, inner: &mut Inner, now: Instant, transitions: &mut Vec<Transition>) {
        match inner.state {
            BreakerState::Closed => {
                inner.counts.on_failure();
                if inner.counts.consecutive_failures >= self.settings.failure_threshold {
                    self.set_state(inner, BreakerState::Open, now, transitions);
                }
            }
            BreakerState::HalfOpen => self.set_state(inner, BreakerState::Open, now, transitions),
            BreakerState::Open => {}
        }
    }

    fn current_state(&self, inner: &mut Inner, now: Instant, transitions: &mut Vec<Transition>) {
        let expired = inner.expiry.is_some_and(|expiry| expiry <= now);
        match inner.state {
            BreakerState::Closed if expired => self.new_generation(inner, now),
            BreakerState::Open if expired => {
                self.set_state(inner, BreakerState::HalfOpen, now, transitions)
            }
            _ => {}
        }
    }

    fn set_state(
        &self,
        inner: &mut Inner,
        state: BreakerState,
        now: Instant,
        transitions: &mut Vec<Transition>,
    ) {
        if inner.state == state {
            return;
        }
        let from = inner.state;
        inner.state = state;
        self.new_generation(inner, now);
        transitions.push((from, state));
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counts.clear();
        inner.expiry = match inner.state {
            BreakerState::Closed => closed_expiry(&self.settings, now),
            BreakerState::Open => Some(now + self.settings.open_timeout),
            BreakerState::HalfOpen => None,
        };
    }

    fn emit(&self, transitions: &[Transition]) {
        for &(from, to) in transitions {
            tracing::warn!(
                circuit_breaker = %self.settings.name,
                from = %from,
                to = %to,
                "Circuit breaker state changed"
            );
            if let Some(observer) = &self.observer {
                observer(&self.settings.name, from, to);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner is consistent after every statement, so a poisoned lock is
        // still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn closed_expiry(settings: &BreakerSettings, now: Instant) -> Option<Instant> {
    (!settings.interval.is_zero()).then(|| now + settings.interval)
}

/// Records a failure if the guarded call never completes.
struct InFlight<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        self.breaker.after_request(self.generation, success);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.after_request(self.generation, false);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings() -> BreakerSettings {
        BreakerSettings {
            name: "test".to_string(),
            max_requests: 3,
            interval: Duration::from_secs(30),
            open_timeout: Duration::from_secs(60),
            failure_threshold: 3,
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.call(async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<u32, BreakerError<&'static str>> {
        cb.call(async { Ok::<_, &'static str>(7) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_consecutive_failures() {
        let cb = CircuitBreaker::new(settings());

        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), BreakerState::Closed);
        assert_eq!(cb.counts().consecutive_failures, 2);

        assert_eq!(fail(&cb).await, Err(BreakerError::Inner("boom")));
        assert_eq!(cb.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_failures() {
        let cb = CircuitBreaker::new(settings());

        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        assert_eq!(succeed(&cb).await, Ok(7));
        fail(&cb).await.unwrap_err();

        assert_eq!(cb.state(), BreakerState::Closed);
        assert_eq!(cb.counts().consecutive_failures, 1);
        assert_eq!(cb.counts().total_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_running_call() {
        let cb = CircuitBreaker::new(settings());
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }

        let attempts = AtomicUsize::new(0);
        let result = cb
            .call(async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(())
            })
            .await;

        assert_eq!(result, Err(BreakerError::Open));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_cooldown_then_closes() {
        let cb = CircuitBreaker::new(settings());
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cb.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cb.state(), BreakerState::HalfOpen);

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), BreakerState::Closed);
        assert_eq!(cb.counts(), Counts::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new(settings());
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        succeed(&cb).await.unwrap();
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), BreakerState::Open);
        assert_eq!(succeed(&cb).await, Err(BreakerError::Open));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_limits_trial_calls() {
        let cb = CircuitBreaker::new(settings());
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        // Three trials admitted but not yet finished.
        let g1 = cb.before_request().unwrap();
        let g2 = cb.before_request().unwrap();
        let g3 = cb.before_request().unwrap();
        assert_eq!(cb.before_request(), Err(Rejection::TooManyRequests));

        for g in [g1, g2, g3] {
            cb.after_request(g, true);
        }
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_clears_closed_counts() {
        let cb = CircuitBreaker::new(settings());
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();

        tokio::time::advance(Duration::from_secs(30)).await;
        fail(&cb).await.unwrap_err();

        assert_eq!(cb.state(), BreakerState::Closed);
        assert_eq!(cb.counts().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_clears() {
        let cb = CircuitBreaker::new(BreakerSettings {
            interval: Duration::ZERO,
            ..settings()
        });
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(3600)).await;
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_outcome_ignored() {
        let cb = CircuitBreaker::new(settings());
        let stale = cb.before_request().unwrap();

        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cb.state(), BreakerState::HalfOpen);

        // Result of a call admitted while closed must not close/reopen.
        cb.after_request(stale, false);
        assert_eq!(cb.state(), BreakerState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_counts_as_failure() {
        let cb = CircuitBreaker::new(settings());

        let pending = cb.call(std::future::pending::<Result<(), &'static str>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());

        assert_eq!(cb.counts().consecutive_failures, 1);
        assert_eq!(cb.counts().requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_transitions() {
        let seen: Arc<Mutex<Vec<(String, BreakerState, BreakerState)>>> = Arc::default();
        let sink = seen.clone();
        let cb = CircuitBreaker::new(settings()).with_observer(Arc::new(
            move |name: &str, from: BreakerState, to: BreakerState| {
                sink.lock().unwrap().push((name.to_string(), from, to));
            },
        ));

        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_secs(60)).await;
        cb.state();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("test".to_string(), BreakerState::Closed, BreakerState::Open),
                ("test".to_string(), BreakerState::Open, BreakerState::HalfOpen),
            ]
        );
    }

    #[test]
    fn test_settings_from_config_clamps_zero() {
        let config = BreakerConfig {
            max_requests: 0,
            failure_threshold: 0,
            ..BreakerConfig::default()
        };
        let settings = BreakerSettings::from_config("x", &config);
        assert_eq!(settings.max_requests, 1);
        assert_eq!(settings.failure_threshold, 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(BreakerState::HalfOpen.to_string(), "half-open");
        assert_eq!(
            BreakerError::<String>::Open.to_string(),
            "circuit breaker is open"
        );
    }
}
