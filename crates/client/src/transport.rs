//! The HTTP transport underneath [`Client`](crate::Client).

use std::{sync::Once, time::Duration};

use anyhow::Context;
use log::debug;
use reqwest::Method;

static GLOBAL_INIT: Once = Once::new();

/// Process-wide transport setup.
///
/// Must be called once before the first [`Client`](crate::Client) is built;
/// later calls are no-ops.
pub fn global_init() {
    GLOBAL_INIT.call_once(|| {
        debug!("Initializing HTTP transport");
        // Building a throwaway client makes the TLS backend run its
        // process-wide setup now instead of during the first request.
        drop(reqwest::blocking::Client::new());
    });
}

pub(crate) fn is_initialized() -> bool {
    GLOBAL_INIT.is_completed()
}

/// A single outgoing request, fully prepared by the client.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Header name/value pairs in the order they are applied.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// The parts of an HTTP response the client consumes.
#[derive(Debug)]
pub struct RawResponse {
    pub status_code: u16,
    /// Raw `name: value` header lines in response order.
    pub headers: Vec<String>,
    pub body: String,
}

/// Performs one HTTP round trip.
///
/// [`HttpTransport`] is the production implementation; tests substitute
/// their own to exercise the client without a network.
pub trait Transport: Send {
    fn perform(&self, request: Request) -> anyhow::Result<RawResponse>;
}

/// Settings applied to every request issued through [`HttpTransport`].
#[derive(Clone, Copy, Debug)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            max_redirects: 5,
            accept_invalid_certs: false,
        }
    }
}

/// [`Transport`] backed by [`reqwest::blocking`].
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(settings: TransportSettings) -> anyhow::Result<Self> {
        let TransportSettings {
            connect_timeout,
            timeout,
            max_redirects,
            accept_invalid_certs,
        } = settings;
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            // One connection per call; the server session lives in the
            // cookie, not the connection.
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .context("Failed to create the HTTP transport")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn perform(&self, request: Request) -> anyhow::Result<RawResponse> {
        let Request {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(method, url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        // hyper never negotiates 100-continue on its own, so there is no
        // `Expect` header to suppress here.
        let response = builder.send()?;
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| format!("{name}: {}", String::from_utf8_lossy(value.as_bytes())))
            .collect();
        let body = response.text().context("Failed to read the response body")?;
        Ok(RawResponse {
            status_code,
            headers,
            body,
        })
    }
}
