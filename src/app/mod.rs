//! Application use cases.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → use case (validate input into value objects, collect every field error)
//!     → domain repository / hasher
//!     → AppError on failure, translated to the wire by http::error
//! ```

pub mod error;
pub mod register_user;

pub use error::{AppError, ErrorKind};
pub use register_user::{RegisterUser, RegisterUserInput, RegisterUserOutput};
