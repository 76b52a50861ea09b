//! Resources torn down after the drain phase.
//!
//! A database pool, cache client or any other dependency that must release
//! its handles before the process exits implements [`Shutdownable`] and is
//! registered with the orchestrator in dependency order.

use async_trait::async_trait;
use tokio::time::Instant;

/// Error returned by a resource teardown.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The resource did not finish before the shutdown deadline.
    #[error("teardown did not finish before the deadline")]
    Timeout,
    /// The resource reported a failure while closing.
    #[error("teardown failed: {0}")]
    Failed(String),
}

/// A dependency with a single teardown operation.
#[async_trait]
pub trait Shutdownable: Send + Sync {
    /// Identity used in shutdown logs.
    fn name(&self) -> &str;

    /// Release the resource, finishing before `deadline` if possible.
    async fn shutdown(&self, deadline: Instant) -> Result<(), ResourceError>;
}
