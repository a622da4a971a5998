//! Failure-rate circuit breaker around a client's invoker.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::invoker::{Invoke, SoapResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("Unexpected Error fetching Service")]
    Unexpected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected without reaching the invoker.
    Open,
    /// A limited number of trial calls decide whether to close again.
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Percentage of failed calls in the window above which the breaker opens.
    pub failure_rate_threshold: f64,
    /// Width of the trailing time window calls are counted over.
    pub window: Duration,
    /// Calls the window must hold before the rate is evaluated.
    pub minimum_calls: usize,
    /// Time spent open before trial calls are admitted.
    pub open_duration: Duration,
    /// Trial calls admitted while half-open; this many successes close the breaker.
    pub half_open_calls: u32,
}

impl CircuitBreakerConfig {
    /// Breaker settings for a client polling every `poll_interval`.
    ///
    /// The window is three seconds per millisecond of connection timeout, and never
    /// shorter than `minimum_calls` poll intervals, so consecutive polls of a failing
    /// endpoint always land in the same window.
    pub fn for_client(connection_timeout: Duration, poll_interval: Duration) -> Self {
        const MINIMUM_CALLS: u32 = 3;
        let millis = u64::try_from(connection_timeout.as_millis()).unwrap_or(u64::MAX);
        let window = Duration::from_secs(millis.saturating_mul(3))
            .max(poll_interval.saturating_mul(MINIMUM_CALLS));
        Self {
            failure_rate_threshold: 10.0,
            window,
            minimum_calls: MINIMUM_CALLS as usize,
            open_duration: window,
            half_open_calls: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// `(recorded at, succeeded)` for calls still inside the window.
    calls: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    trials_admitted: u32,
    trial_successes: u32,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                calls: VecDeque::new(),
                opened_at: None,
                trials_admitted: 0,
                trial_successes: 0,
            }),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub async fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().await;
        self.refresh(&mut inner);
        inner.state
    }

    /// Whether a call may go through now. Counts as a trial while half-open.
    pub async fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().await;
        self.refresh(&mut inner);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.trials_admitted < self.config.half_open_calls {
                    inner.trials_admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => {
                let now = Instant::now();
                inner.calls.push_back((now, true));
                self.prune(&mut inner, now);
            }
            CircuitState::HalfOpen => {
                inner.trial_successes += 1;
                if inner.trial_successes >= self.config.half_open_calls {
                    inner.state = CircuitState::Closed;
                    inner.calls.clear();
                    inner.opened_at = None;
                    tracing::info!(
                        breaker = %self.name,
                        successes = inner.trial_successes,
                        "circuit breaker closed"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => {
                inner.calls.push_back((now, false));
                self.prune(&mut inner, now);
                let total = inner.calls.len();
                if total < self.config.minimum_calls {
                    return;
                }
                let failed = inner.calls.iter().filter(|(_, ok)| !ok).count();
                let rate = failed as f64 * 100.0 / total as f64;
                if rate > self.config.failure_rate_threshold {
                    self.open(&mut inner, now);
                    tracing::warn!(
                        breaker = %self.name,
                        failure_rate = rate,
                        calls = total,
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open(&mut inner, now);
                tracing::warn!(breaker = %self.name, "circuit breaker reopened from half-open state");
            }
            CircuitState::Open => {}
        }
    }

    fn open(&self, inner: &mut BreakerState, now: Instant) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now);
        inner.calls.clear();
    }

    fn prune(&self, inner: &mut BreakerState, now: Instant) {
        while let Some((at, _)) = inner.calls.front() {
            if now.duration_since(*at) >= self.config.window {
                inner.calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn refresh(&self, inner: &mut BreakerState) {
        if inner.state != CircuitState::Open {
            return;
        }
        if let Some(opened_at) = inner.opened_at {
            if opened_at.elapsed() >= self.config.open_duration {
                inner.state = CircuitState::HalfOpen;
                inner.trials_admitted = 0;
                inner.trial_successes = 0;
                tracing::info!(breaker = %self.name, "circuit breaker transitioning to half-open");
            }
        }
    }
}

/// An invoker guarded by its own breaker. Invoker failures are logged and collapse into
/// [`PollError::Unexpected`].
pub struct CircuitBreakerTask {
    invoker: Arc<dyn Invoke>,
    breaker: CircuitBreaker,
}

impl CircuitBreakerTask {
    pub fn new(invoker: Arc<dyn Invoke>, breaker: CircuitBreaker) -> Self {
        Self { invoker, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn call(&self) -> Result<SoapResponse, PollError> {
        if !self.breaker.try_acquire().await {
            return Err(PollError::CircuitOpen);
        }
        match self.invoker.invoke().await {
            Ok(resp) => {
                self.breaker.on_success().await;
                Ok(resp)
            }
            Err(e) => {
                tracing::error!(breaker = %self.breaker.name, error = %e, "invocation failed");
                self.breaker.on_failure().await;
                Err(PollError::Unexpected)
            }
        }
    }
}
