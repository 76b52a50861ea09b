//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! APP_ENV + CONFIG_PATH (or CLI flags)
//!     → loader.rs (read config.<env>.toml, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; a missing file yields the default config
//! - Bind address, log level and shutdown budget can be overridden from the environment
//! - Validation reports every problem at once

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Environment};
pub use schema::{AppConfig, ObservabilityConfig, ServiceConfig, ShutdownConfig, UserStoreConfig};
