//! HTTP transport used by the run controller.
//!
//! The controller only sees the [`Transport`] trait; [`http::HttpTransport`]
//! is the reqwest-backed implementation used outside of tests.

pub mod http;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::time::Duration;

use crate::error::Result;

pub use http::HttpTransport;

/// HTTP method of a reporter call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// Outbound request with a JSON body
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: String,
    pub timeout: Duration,
}

/// Status and raw body of a completed call
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Sends a single request; no retries, no state kept between calls.
///
/// Implementations must be usable from several threads at once since
/// per-test reports can arrive concurrently.
pub trait Transport: Send + Sync {
    /// Timeouts and connection failures come back as `ReporterError::Transport`
    fn send(&self, request: &Request) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}
