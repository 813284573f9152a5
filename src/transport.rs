//! HTTP transport abstraction.
//!
//! The reconciler only needs single request/response exchanges, so the seam
//! is one async method. The default implementation is backed by `reqwest`
//! (feature `reqwest-transport`); tests and hosts with their own HTTP stack
//! plug in another one.

use std::future::Future;

use serde_json::Value;
use strum_macros::{AsRefStr, Display};

/// HTTP verbs used by the Hue v1 API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
}

/// One outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        HttpResponse {
            status: 200,
            body: body.into(),
        }
    }
}

/// Failure to complete an exchange at all (refused, timed out, reset).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Trait for issuing a single HTTP exchange.
pub trait Transport: Send + Sync {
    /// Performs exactly one attempt; no retries.
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest-transport")]
pub use reqwest_impl::ReqwestTransport;

#[cfg(feature = "reqwest-transport")]
mod reqwest_impl {
    use std::time::Duration;

    use super::{HttpResponse, Method, Request, Transport, TransportError};

    /// `reqwest` based transport with a short connect timeout.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        http: reqwest::Client,
    }

    impl ReqwestTransport {
        const CONNECT_TIMEOUT_SECS: u64 = 2;

        pub fn new() -> Result<Self, TransportError> {
            let http = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(Self::CONNECT_TIMEOUT_SECS))
                .build()
                .map_err(|e| TransportError(e.to_string()))?;
            Ok(Self { http })
        }
    }

    impl Transport for ReqwestTransport {
        async fn send(&self, request: Request) -> Result<HttpResponse, TransportError> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Put => reqwest::Method::PUT,
                Method::Post => reqwest::Method::POST,
            };
            let mut builder = self.http.request(method, &request.url);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            let response = builder
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError(e.to_string()))?;
            Ok(HttpResponse { status, body })
        }
    }
}
