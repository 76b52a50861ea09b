//! Request identity.
//!
//! # Design Decisions
//! - A fresh UUID v4 is assigned by the admission middleware to every
//!   admitted request; rejected requests never get one
//! - The id travels in request extensions, in the `request` span and in the
//!   `x-request-id` response header

use std::fmt;

use axum::http::Request;
use uuid::Uuid;

/// Response header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access the id the admission middleware attached to a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<RequestId> {
        self.extensions().get::<RequestId>().copied()
    }
}
