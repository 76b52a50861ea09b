//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

/// Root configuration for the user service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener and environment.
    pub app: AppConfig,

    /// Graceful shutdown budget.
    pub shutdown: ShutdownConfig,

    /// User store limits.
    pub user_store: UserStoreConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment name the config was loaded for.
    pub env: String,

    /// Bind address (e.g., "0.0.0.0:50051").
    pub bind_address: String,

    /// Per-request timeout in seconds, enforced by the HTTP layer.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "local".to_string(),
            bind_address: "0.0.0.0:50051".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Graceful shutdown timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Total budget for listener stop, drain and teardown.
    pub total_timeout_secs: u64,

    /// Budget for the graceful listener stop before it is forced.
    /// Capped at `total_timeout_secs`.
    pub listener_timeout_secs: u64,

    /// How often draining reports long-running requests.
    pub drain_poll_interval_secs: u64,

    /// Age after which an in-flight request is reported as long-running.
    pub long_running_threshold_secs: u64,

    /// Minimum time each resource gets to shut down, even when the total
    /// budget is already spent.
    pub teardown_grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout_secs: 30,
            listener_timeout_secs: 20,
            drain_poll_interval_secs: 2,
            long_running_threshold_secs: 5,
            teardown_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserStoreConfig {
    /// Maximum number of registered users.
    pub max_users: usize,
}

impl Default for UserStoreConfig {
    fn default() -> Self {
        Self { max_users: 100_000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
