//! Shutdown coordination for the service.
//!
//! # State Machine
//! ```text
//! Running ──(signal | request_shutdown)──▶ StoppingListener
//!     flag flipped, graceful stop raced against the listener sub-deadline,
//!     forced stop on expiry
//! StoppingListener ──▶ Draining
//!     wait for in-flight requests until the total deadline
//! Draining ──(drained | timed out)──▶ TearingDown
//!     every registered resource, in registration order, failures logged
//! TearingDown ──▶ Stopped
//! ```
//!
//! Nothing in the shutdown path is fatal: timeouts and teardown errors are
//! logged and the sequence always reaches `Stopped`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::ShutdownConfig;
use crate::lifecycle::resource::{ResourceError, Shutdownable};
use crate::lifecycle::signals::{os_termination_signal, TerminationSignal};
use crate::lifecycle::tracker::RequestTracker;

/// Programmatic shutdown trigger.
///
/// Any clone can request shutdown; the request is sticky, so tasks that start
/// waiting after it was made still observe it.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Returns `false` if it had already been requested.
    pub fn request_shutdown(&self) -> bool {
        let already = self.tx.send_replace(true);
        if !already {
            tracing::info!("Shutdown requested");
        }
        !already
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Server side of the transport, as seen by the orchestrator.
#[async_trait]
pub trait Transport: Send {
    /// Stop accepting connections and resolve once accepted calls finished.
    async fn graceful_stop(&mut self);

    /// Stop immediately, abandoning connections still open.
    async fn force_stop(&mut self);
}

/// Phase of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    StoppingListener,
    Draining,
    TearingDown,
    Stopped,
}

/// What moved the service out of `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Signal(TerminationSignal),
    Requested,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Signal(signal) => write!(f, "signal {}", signal),
            ShutdownCause::Requested => write!(f, "programmatic request"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStop {
    Graceful,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Drained,
    TimedOut { remaining: usize },
}

/// Summary of a completed shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub cause: ShutdownCause,
    pub listener: ListenerStop,
    pub drain: DrainOutcome,
    /// Names of resources whose teardown failed or timed out.
    pub failed_resources: Vec<String>,
}

/// Sequences listener stop, drain and resource teardown.
pub struct ShutdownOrchestrator {
    tracker: RequestTracker,
    trigger: ShutdownTrigger,
    resources: Vec<Arc<dyn Shutdownable>>,
    total_timeout: Duration,
    listener_timeout: Duration,
    teardown_grace: Duration,
    phase: watch::Sender<ShutdownPhase>,
}

impl ShutdownOrchestrator {
    pub fn new(tracker: RequestTracker, trigger: ShutdownTrigger, config: &ShutdownConfig) -> Self {
        let total_timeout = Duration::from_secs(config.total_timeout_secs);
        let listener_timeout = Duration::from_secs(config.listener_timeout_secs).min(total_timeout);
        let (phase, _) = watch::channel(ShutdownPhase::Running);
        Self {
            tracker,
            trigger,
            resources: Vec::new(),
            total_timeout,
            listener_timeout,
            teardown_grace: Duration::from_secs(config.teardown_grace_secs),
            phase,
        }
    }

    /// Register a resource. Teardown runs in registration order.
    pub fn register(&mut self, resource: Arc<dyn Shutdownable>) {
        tracing::debug!(resource = resource.name(), "Registered shutdown resource");
        self.resources.push(resource);
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    /// Watch the current phase.
    ///
    /// The channel closes when the orchestrator is consumed by a finished
    /// shutdown; the final `Stopped` value stays readable through `borrow`.
    pub fn phase(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase.subscribe()
    }

    /// Wait for an OS termination signal or a programmatic request, then shut down.
    pub async fn run<T: Transport>(self, transport: T) -> ShutdownReport {
        self.run_until(transport, os_termination_signal()).await
    }

    /// Like [`run`](Self::run) with a caller-supplied signal source.
    pub async fn run_until<T, S>(self, transport: T, signal: S) -> ShutdownReport
    where
        T: Transport,
        S: Future<Output = TerminationSignal>,
    {
        let cause = tokio::select! {
            signal = signal => ShutdownCause::Signal(signal),
            _ = self.trigger.triggered() => ShutdownCause::Requested,
        };
        // Make the transition visible to everything holding the trigger.
        self.trigger.request_shutdown();
        tracing::info!(cause = %cause, "Received shutdown trigger");

        self.shutdown(transport, cause).await
    }

    /// Run the shutdown sequence now.
    pub async fn shutdown<T: Transport>(self, mut transport: T, cause: ShutdownCause) -> ShutdownReport {
        let started = Instant::now();
        let deadline = started + self.total_timeout;
        tracing::info!(
            total_timeout = ?self.total_timeout,
            active = self.tracker.active_count(),
            "Starting graceful shutdown"
        );

        // Reject new admissions before the listener stops.
        self.tracker.set_shutting_down(true);

        self.enter(ShutdownPhase::StoppingListener);
        let listener_deadline = started + self.listener_timeout;
        let listener = match tokio::time::timeout_at(listener_deadline, transport.graceful_stop()).await {
            Ok(()) => {
                tracing::info!("Listener stopped gracefully");
                ListenerStop::Graceful
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.listener_timeout,
                    "Listener stop timed out, forcing stop"
                );
                transport.force_stop().await;
                ListenerStop::Forced
            }
        };

        self.enter(ShutdownPhase::Draining);
        tracing::info!(active = self.tracker.active_count(), "Waiting for active requests to complete");
        let drain = match self.tracker.wait_for_completion(deadline).await {
            Ok(()) => {
                tracing::info!("All in-flight requests completed");
                DrainOutcome::Drained
            }
            Err(timeout) => {
                tracing::warn!(
                    remaining = timeout.remaining,
                    "Timed out waiting for requests to complete"
                );
                DrainOutcome::TimedOut {
                    remaining: timeout.remaining,
                }
            }
        };

        self.enter(ShutdownPhase::TearingDown);
        let failed_resources = self.tear_down(deadline).await;

        self.enter(ShutdownPhase::Stopped);
        tracing::info!(
            elapsed = ?started.elapsed(),
            failed_resources = failed_resources.len(),
            "Graceful shutdown completed"
        );

        ShutdownReport {
            cause,
            listener,
            drain,
            failed_resources,
        }
    }

    async fn tear_down(&self, deadline: Instant) -> Vec<String> {
        let mut failed = Vec::new();
        for resource in &self.resources {
            let name = resource.name();
            // A timed-out drain can spend the whole budget; every resource
            // still gets the grace period to close.
            let resource_deadline = deadline.max(Instant::now() + self.teardown_grace);
            let shutdown = resource.shutdown(resource_deadline);
            let result = match tokio::time::timeout_at(resource_deadline, shutdown).await {
                Ok(result) => result,
                Err(_) => Err(ResourceError::Timeout),
            };

            match result {
                Ok(()) => tracing::info!(resource = name, "Resource shut down"),
                Err(e) => {
                    tracing::error!(resource = name, error = %e, "Error shutting down resource");
                    failed.push(name.to_string());
                }
            }
        }
        failed
    }

    fn enter(&self, phase: ShutdownPhase) {
        tracing::debug!(phase = ?phase, "Shutdown phase");
        self.phase.send_replace(phase);
    }
}
