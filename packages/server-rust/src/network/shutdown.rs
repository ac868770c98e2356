//! Graceful shutdown controller with in-flight dispatch tracking.
//!
//! Health state lives in an `ArcSwap`. Each running callable holds a
//! [`DispatchGuard`]; the guard travels with the callable onto the blocking
//! pool, so a dispatch counts as in flight until the callable returns, even
//! when the HTTP request that started it is gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Notify};

/// Server health state, transitioned by the shutdown controller.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Ready,
    /// New dispatches are refused; running ones are allowed to finish.
    Draining,
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Default)]
struct DispatchTracker {
    running: AtomicU64,
    drained: Notify,
}

/// Coordinates shutdown between the listener, the health probes and the
/// dispatch service.
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    dispatches: Arc<DispatchTracker>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            dispatches: Arc::default(),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Returns a receiver that flips to `true` once shutdown is triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Moves to `Draining` and signals all shutdown receivers.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
        // Receivers may already be gone.
        let _ = self.shutdown_signal.send(true);
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Whether new dispatches may start.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        matches!(self.health_state(), HealthState::Starting | HealthState::Ready)
    }

    /// Registers one dispatch, or returns `None` once draining has begun.
    ///
    /// The counter is bumped before the state is checked, so a drain that
    /// observes zero running dispatches can never be followed by a dispatch
    /// that was admitted.
    #[must_use]
    pub fn begin_dispatch(&self) -> Option<DispatchGuard> {
        self.dispatches.running.fetch_add(1, Ordering::SeqCst);
        let guard = DispatchGuard {
            tracker: Arc::clone(&self.dispatches),
        };
        self.is_accepting().then_some(guard)
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.dispatches.running.load(Ordering::SeqCst)
    }

    /// Waits until no dispatch is running, up to `timeout`.
    ///
    /// Returns `true` and transitions to `Stopped` on success. Returns `false`
    /// if the timeout expired; the state then remains `Draining`.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let drained = self.dispatches.drained.notified();
            if self.in_flight_count() == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }
            if tokio::time::timeout_at(deadline, drained).await.is_err() {
                return false;
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks one dispatch as running until dropped, including during unwinding.
#[derive(Debug)]
pub struct DispatchGuard {
    tracker: Arc<DispatchTracker>,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if self.tracker.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.drained.notify_waiters();
        }
    }
}
