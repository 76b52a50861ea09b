//! User service
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ admission ──▶ handler ──▶ RegisterUser ──▶ user store
//!                    │
//!                    ▼
//!              RequestTracker ◀── ShutdownOrchestrator ◀── SIGINT / SIGTERM
//!                                        │
//!                                        ├─ stop listener
//!                                        ├─ drain in-flight requests
//!                                        └─ tear down resources
//! ```

use std::path::PathBuf;

use clap::Parser;

use user_service::config::{load_config, Environment};
use user_service::lifecycle::{DrainOutcome, Service};
use user_service::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "User registration service with graceful shutdown", long_about = None)]
struct Cli {
    /// Deployment environment (local, develop, prod).
    #[arg(short, long, env = "APP_ENV", default_value = "local")]
    env: String,

    /// Directory holding config.<env>.toml.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config")]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env: Environment = cli.env.parse()?;
    let config = load_config(env, &cli.config_path)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %env,
        bind_address = %config.app.bind_address,
        shutdown_timeout_secs = config.shutdown.total_timeout_secs,
        "user-service starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Service::bind(&config).await?;
    let report = service.run().await?;

    match report.drain {
        DrainOutcome::Drained => tracing::info!(cause = %report.cause, "Service stopped"),
        DrainOutcome::TimedOut { remaining } => {
            tracing::warn!(cause = %report.cause, remaining, "Service stopped with requests still in flight")
        }
    }
    if !report.failed_resources.is_empty() {
        tracing::warn!(resources = ?report.failed_resources, "Some resources failed to shut down");
    }

    Ok(())
}
