//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use user_service::config::{ServiceConfig, ShutdownConfig};
use user_service::infra::MemoryUserStore;
use user_service::lifecycle::{
    RequestTracker, Service, ShutdownPhase, ShutdownReport, ShutdownTrigger, StartupError, TerminationSignal,
};

/// A service running on an ephemeral port, stopped only through its trigger.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub trigger: ShutdownTrigger,
    pub tracker: RequestTracker,
    pub phase: watch::Receiver<ShutdownPhase>,
    pub store: Arc<MemoryUserStore>,
    pub task: JoinHandle<Result<ShutdownReport, StartupError>>,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start(shutdown: ShutdownConfig) -> TestService {
    let mut config = ServiceConfig::default();
    config.app.bind_address = "127.0.0.1:0".to_string();
    config.shutdown = shutdown;

    let service = Service::bind(&config).await.expect("bind");
    let addr = service.local_addr();
    let trigger = service.trigger();
    let tracker = service.tracker();
    let phase = service.phase();
    let store = service.user_store();
    let task = tokio::spawn(service.run_until(std::future::pending::<TerminationSignal>()));

    TestService {
        addr,
        trigger,
        tracker,
        phase,
        store,
        task,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
