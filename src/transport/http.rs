//! reqwest-backed transport
//!
//! Uses the blocking client: every reporter call is synchronous from the
//! caller's point of view and blocks for at most the request timeout.

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

use super::{Method, Request, Response, Transport};
use crate::error::{ReporterError, Result};
use crate::utils::config::ReporterConfig;

const CONTENT_TYPE_JSON: &str = "application/json";

/// HTTP transport over a shared `reqwest::blocking::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose client-level timeout matches the config
    pub fn new(config: &ReporterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ReporterError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let builder = match request.method {
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };

        let response = builder
            .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))
            .timeout(request.timeout)
            .body(request.body.clone())
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;

        Ok(Response { status, body })
    }
}
