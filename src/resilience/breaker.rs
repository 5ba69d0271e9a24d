//! Circuit breaker for failing dependencies

use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through, failures are counted
    Closed,
    /// Calls are rejected immediately
    Open,
    /// One trial call is permitted
    HalfOpen,
}

impl Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned by a breaker-guarded call
#[derive(Debug, Error)]
pub enum BreakerError<E: Display + Debug> {
    /// The breaker rejected the call without invoking it
    #[error("circuit breaker is open")]
    Open,
    /// The wrapped call failed
    #[error("{0}")]
    Inner(E),
}

struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
}

/// Circuit breaker guarding an outbound call path
///
/// After `failure_threshold` consecutive failures the breaker opens and
/// rejects calls without invoking them. Once `recovery_timeout` elapses a
/// single trial call is let through; its outcome alone decides whether the
/// breaker closes again or re-opens with a fresh timeout.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and permits a trial call after `recovery_timeout`
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    /// Execute `f` under breaker protection
    ///
    /// Fails fast with [`BreakerError::Open`] when the breaker is open and
    /// the recovery timeout has not elapsed, or when another trial call is
    /// already in flight.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Debug,
    {
        self.admit()?;

        match f().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    fn admit<E: Display + Debug>(&self) -> Result<(), BreakerError<E>> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.recovery_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(BreakerError::Open)
                }
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    // The single permitted trial is still running
                    Err(BreakerError::Open)
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.failure_count = 0;
        inner.trial_in_flight = false;
        inner.state = BreakerState::Closed;
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        inner.trial_in_flight = false;

        if inner.state == BreakerState::HalfOpen {
            // Failed trial call re-opens with a fresh timeout
            inner.state = BreakerState::Open;
        } else if inner.failure_count >= self.failure_threshold {
            inner.state = BreakerState::Open;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail() -> Result<(), String> {
        Err("boom".to_string())
    }

    fn succeed() -> Result<u32, String> {
        Ok(42)
    }

    #[tokio::test]
    async fn test_breaker_starts_closed() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert_eq!(breaker.state(), BreakerState::Closed);

        let result = breaker.call(|| async { succeed() }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_breaker_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        for _ in 0..2 {
            let _ = breaker.call(|| async { fail() }).await;
            assert_eq!(breaker.state(), BreakerState::Closed);
        }
        let _ = breaker.call(|| async { fail() }).await;
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test]
    async fn test_open_breaker_rejects_without_invoking() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        let _ = breaker.call(|| async { fail() }).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        let mut invoked = false;
        let result: Result<(), _> = breaker
            .call(|| {
                invoked = true;
                async { succeed().map(|_| ()) }
            })
            .await;

        assert!(matches!(result, Err(BreakerError::Open)));
        assert!(!invoked, "open breaker must not invoke the wrapped call");
    }

    #[tokio::test]
    async fn test_trial_call_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _ = breaker.call(|| async { fail() }).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(15));

        let result = breaker.call(|| async { succeed() }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_trial_call_reopens_on_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _ = breaker.call(|| async { fail() }).await;

        std::thread::sleep(Duration::from_millis(15));

        let _ = breaker.call(|| async { fail() }).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        // Timeout was reset by the failed trial: still rejected
        let result: Result<u32, _> = breaker.call(|| async { succeed() }).await;
        assert!(matches!(result, Err(BreakerError::Open)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        let _ = breaker.call(|| async { fail() }).await;
        let _ = breaker.call(|| async { fail() }).await;
        let _ = breaker.call(|| async { succeed() }).await;

        // Two more failures should not reach the threshold of three
        let _ = breaker.call(|| async { fail() }).await;
        let _ = breaker.call(|| async { fail() }).await;
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_only_one_trial_call_admitted() {
        let breaker = std::sync::Arc::new(CircuitBreaker::new(1, Duration::from_millis(10)));
        let _ = breaker.call(|| async { fail() }).await;
        std::thread::sleep(Duration::from_millis(15));

        // First caller takes the trial slot and holds it across an await
        let b = breaker.clone();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = tokio::spawn(async move {
            b.call(|| async {
                started_tx.send(()).unwrap();
                let _ = release_rx.await;
                succeed()
            })
            .await
        });

        started_rx.await.unwrap();
        let result: Result<u32, _> = breaker.call(|| async { succeed() }).await;
        assert!(matches!(result, Err(BreakerError::Open)));

        release_tx.send(()).unwrap();
        trial.await.unwrap().unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(BreakerState::Closed.to_string(), "closed");
        assert_eq!(BreakerState::Open.to_string(), "open");
        assert_eq!(BreakerState::HalfOpen.to_string(), "half-open");
    }
}
