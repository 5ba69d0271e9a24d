//! Emergency stop latch

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

type StopCallback = Box<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Details of a trigger event
#[derive(Debug, Clone)]
pub struct StopInfo {
    pub reason: String,
    pub triggered_at: DateTime<Utc>,
}

/// Process-wide emergency stop
///
/// A single-admission latch: among any number of concurrent `trigger` calls
/// exactly one wins the race and runs the registered callbacks (close every
/// open position); the rest observe the latch already set and only log.
/// Once triggered it stays triggered until an explicit operator `reset`.
pub struct EmergencyStop {
    triggered: AtomicBool,
    info: std::sync::Mutex<Option<StopInfo>>,
    callbacks: Mutex<Vec<StopCallback>>,
}

impl EmergencyStop {
    /// Create an untriggered stop
    pub fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            info: std::sync::Mutex::new(None),
            callbacks: Mutex::new(vec![]),
        }
    }

    /// Register a callback executed on trigger
    pub async fn register<F, Fut>(&self, callback: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks
            .lock()
            .await
            .push(Box::new(move |reason| Box::pin(callback(reason))));
    }

    /// Trigger the stop; returns whether this call won the race
    ///
    /// The winner records the reason and runs every registered callback; a
    /// callback panicking or erroring inside its own task must not prevent
    /// the others from running, so callbacks are infallible by signature.
    pub async fn trigger(&self, reason: &str) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(reason, "Emergency stop already triggered, ignoring");
            return false;
        }

        {
            let mut info = self.info.lock().expect("stop info lock poisoned");
            *info = Some(StopInfo {
                reason: reason.to_string(),
                triggered_at: Utc::now(),
            });
        }

        tracing::error!(reason, "EMERGENCY STOP TRIGGERED");

        let callbacks = self.callbacks.lock().await;
        for callback in callbacks.iter() {
            callback(reason.to_string()).await;
        }

        true
    }

    /// Whether the stop has been triggered
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Trigger details, if triggered
    pub fn info(&self) -> Option<StopInfo> {
        self.info.lock().expect("stop info lock poisoned").clone()
    }

    /// Operator reset; clears the latch so new positions may open again
    pub fn reset(&self) {
        self.triggered.store(false, Ordering::SeqCst);
        *self.info.lock().expect("stop info lock poisoned") = None;
        tracing::info!("Emergency stop reset");
    }
}

impl Default for EmergencyStop {
    fn default() -> Self {
        Self::new()
    }
}
