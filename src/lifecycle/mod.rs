//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → tracker + orchestrator → resources registered → bind listener
//!
//! Serving (tracker.rs):
//!     admission middleware → begin / end per request
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT or trigger → reject new requests → stop listener
//!     → drain in-flight requests → tear down resources → Stopped
//! ```
//!
//! # Design Decisions
//! - Ordered startup: resources first, listener last
//! - Ordered shutdown: flag, listener, drain, resources
//! - One total deadline bounds the whole shutdown sequence

pub mod resource;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod tracker;

pub use resource::{ResourceError, Shutdownable};
pub use shutdown::{
    DrainOutcome, ListenerStop, ShutdownCause, ShutdownOrchestrator, ShutdownPhase, ShutdownReport,
    ShutdownTrigger, Transport,
};
pub use signals::TerminationSignal;
pub use startup::{Service, StartupError};
pub use tracker::{DrainSettings, DrainTimeout, RequestGuard, RequestTracker};
