//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the request tracker and shutdown orchestrator from config
//! - Initialize resources and register them for teardown
//! - Bind the listener and hand the running server to the orchestrator
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Resources are registered in the order they must be torn down
//! - The listener binds last (traffic only when ready)

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::app::RegisterUser;
use crate::config::ServiceConfig;
use crate::http::{AppState, HttpServer};
use crate::infra::{Argon2Hasher, MemoryUserStore};
use crate::lifecycle::shutdown::{ShutdownOrchestrator, ShutdownPhase, ShutdownReport, ShutdownTrigger};
use crate::lifecycle::signals::{os_termination_signal, TerminationSignal};
use crate::lifecycle::tracker::{DrainSettings, RequestTracker};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("listener error: {0}")]
    Listener(#[from] io::Error),
}

/// A fully wired service, bound and ready to serve.
pub struct Service {
    orchestrator: ShutdownOrchestrator,
    server: HttpServer,
    listener: TcpListener,
    local_addr: SocketAddr,
    store: Arc<MemoryUserStore>,
}

impl Service {
    /// Initialize every subsystem and bind the listener.
    pub async fn bind(config: &ServiceConfig) -> Result<Self, StartupError> {
        let tracker = RequestTracker::with_settings(DrainSettings::from(&config.shutdown));
        let trigger = ShutdownTrigger::new();
        let mut orchestrator = ShutdownOrchestrator::new(tracker.clone(), trigger, &config.shutdown);

        let store = Arc::new(MemoryUserStore::new(config.user_store.max_users));
        orchestrator.register(store.clone());
        tracing::info!(max_users = config.user_store.max_users, "User store initialized");

        let state = AppState {
            register_user: RegisterUser::new(store.clone(), Arc::new(Argon2Hasher)),
        };
        let server = HttpServer::new(&config.app, state, tracker);

        let listener = TcpListener::bind(&config.app.bind_address)
            .await
            .map_err(|source| StartupError::Bind {
                address: config.app.bind_address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, env = %config.app.env, "Listening for connections");

        Ok(Self {
            orchestrator,
            server,
            listener,
            local_addr,
            store,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        self.orchestrator.trigger()
    }

    pub fn tracker(&self) -> RequestTracker {
        self.orchestrator.tracker().clone()
    }

    pub fn phase(&self) -> watch::Receiver<ShutdownPhase> {
        self.orchestrator.phase()
    }

    pub fn user_store(&self) -> Arc<MemoryUserStore> {
        self.store.clone()
    }

    /// Serve until SIGINT, SIGTERM or a programmatic trigger, then shut down.
    pub async fn run(self) -> Result<ShutdownReport, StartupError> {
        self.run_until(os_termination_signal()).await
    }

    /// Like [`run`](Self::run) with a caller-supplied signal source.
    pub async fn run_until<S>(self, signal: S) -> Result<ShutdownReport, StartupError>
    where
        S: Future<Output = TerminationSignal>,
    {
        let handle = self.server.spawn(self.listener)?;
        Ok(self.orchestrator.run_until(handle, signal).await)
    }
}
