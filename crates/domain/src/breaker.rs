use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Circuit breaker state gating delivery attempts to the log consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — all attempts allowed.
    Closed = 0,
    /// Single probe window after the open duration elapsed.
    HalfOpen = 1,
    /// All attempts blocked until the open duration elapses.
    Open = 2,
}

impl CircuitState {
    /// Numeric value for the Prometheus gauge (0=closed, 1=half-open, 2=open).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::HalfOpen => "half_open",
            Self::Open => "open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: usize,
    last_failure_at: Option<Instant>,
}

/// Circuit breaker over consumer outcomes.
///
/// Transitions: Closed → Open after `threshold` consecutive failures,
/// Open → `HalfOpen` once `open_duration` has elapsed since the last
/// failure, `HalfOpen` → Closed on success or back to Open on failure.
///
/// One breaker exists per receiver instance and its state is process-local.
/// All methods take `&self` and are safe under concurrent calls; a disabled
/// breaker behaves as permanently closed and records nothing.
#[derive(Debug)]
pub struct CircuitBreaker {
    enabled: bool,
    threshold: usize,
    open_duration: Duration,
    inner: RwLock<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(enabled: bool, threshold: usize, open_duration: Duration) -> Self {
        Self {
            enabled,
            threshold,
            open_duration,
            inner: RwLock::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a delivery attempt may proceed.
    ///
    /// Transitions Open → `HalfOpen` when the open duration has elapsed
    /// since the last failure; performs at most one transition per call.
    pub fn attempt_allowed(&self) -> bool {
        if !self.enabled {
            return true;
        }

        {
            let inner = self.inner.read().unwrap();
            match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => return true,
                CircuitState::Open => {
                    let eligible = inner
                        .last_failure_at
                        .is_some_and(|at| at.elapsed() >= self.open_duration);
                    if !eligible {
                        return false;
                    }
                }
            }
        }

        // Open and the dwell time has passed: promote to half-open under
        // the write lock, re-checking in case a racing call got there first.
        let mut inner = self.inner.write().unwrap();
        if inner.state == CircuitState::Open {
            inner.state = CircuitState::HalfOpen;
            tracing::info!("circuit breaker transitioning to half-open");
        }
        matches!(
            inner.state,
            CircuitState::Closed | CircuitState::HalfOpen
        )
    }

    /// Record a successful delivery: reset the failure count and force
    /// the circuit closed.
    pub fn on_success(&self) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.write().unwrap();
        let was_half_open = inner.state == CircuitState::HalfOpen;
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
        if was_half_open {
            tracing::info!("circuit breaker closed after successful probe");
        }
    }

    /// Record a failed delivery. A half-open failure reopens immediately;
    /// a closed failure opens once the consecutive count reaches the
    /// threshold.
    pub fn on_failure(&self) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.write().unwrap();
        inner.consecutive_failures += 1;
        inner.last_failure_at = Some(Instant::now());

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            tracing::warn!(
                failures = inner.consecutive_failures,
                "circuit breaker reopened: probe failed"
            );
        } else if inner.consecutive_failures >= self.threshold {
            inner.state = CircuitState::Open;
            tracing::warn!(
                failures = inner.consecutive_failures,
                "circuit breaker opened: failure threshold reached"
            );
        }
    }

    /// Current state, for metrics and readiness reporting.
    pub fn state(&self) -> CircuitState {
        if !self.enabled {
            return CircuitState::Closed;
        }
        self.inner.read().unwrap().state
    }
}
