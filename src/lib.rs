//! User service library.
//!
//! Registration API with request tracking and phased graceful shutdown.

pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{RequestTracker, Service, ShutdownOrchestrator, ShutdownReport, ShutdownTrigger};
