//! HTTP surface of the user service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → middleware/admission.rs (reject while shutting down, assign id, track)
//!     → handler (user use cases)
//!     → error.rs (AppError → status + JSON body)
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerHandle, REGISTER_USER_PATH};
