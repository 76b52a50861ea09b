//! Configuration validation.
//!
//! Pure function over a parsed config; returns every error, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| errors.push(ValidationError { field, message });

    if config.app.bind_address.parse::<SocketAddr>().is_err() {
        fail("app.bind_address", format!("'{}' is not a socket address", config.app.bind_address));
    }
    if config.app.request_timeout_secs == 0 {
        fail("app.request_timeout_secs", "must be greater than zero".into());
    }

    let shutdown = &config.shutdown;
    if shutdown.total_timeout_secs == 0 {
        fail("shutdown.total_timeout_secs", "must be greater than zero".into());
    }
    if shutdown.listener_timeout_secs == 0 {
        fail("shutdown.listener_timeout_secs", "must be greater than zero".into());
    }
    if shutdown.listener_timeout_secs > shutdown.total_timeout_secs {
        fail(
            "shutdown.listener_timeout_secs",
            format!("must not exceed total_timeout_secs ({})", shutdown.total_timeout_secs),
        );
    }
    if shutdown.drain_poll_interval_secs == 0 {
        fail("shutdown.drain_poll_interval_secs", "must be greater than zero".into());
    }

    if config.user_store.max_users == 0 {
        fail("user_store.max_users", "must be greater than zero".into());
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        fail(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
