//! halyard-transport
//!
//! HTTP plumbing for the reconciler. Thin wrapper around reqwest plus the
//! retry policy shared with the apply loop.
//!
//! ## Public API
//!
//! - [`Transport`]: the request/response seam the reconciler talks to
//! - [`HttpTransport`]: reqwest-backed implementation
//! - [`RetryPolicy`] / [`Backoff`]: retry decision and delay schedule
//! - [`RetryingTransport`]: retries transient failures (5xx, 429)
//! - `fake::FakeTransport`: scripted in-memory transport for tests, behind
//!   the `test-util` feature

pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod http;
pub mod request;
pub mod retry;

use std::future::Future;
use std::pin::Pin;

pub use error::TransportError;
pub use http::HttpTransport;
pub use request::{Method, Request, Response};
pub use retry::{Backoff, RetryPolicy, RetryingTransport};

/// A boxed future, used to keep [`Transport`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends one HTTP request.
///
/// Implementations return `Ok` only for 2xx responses; every other status
/// is mapped to a [`TransportError`] via [`error::error_for_status`].
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>>;
}
