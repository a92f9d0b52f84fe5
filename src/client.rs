use std::{fmt, time::Instant};

use futures_util::StreamExt;
use reqwest::{
    Method, StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, HeaderMap, HeaderValue, InvalidHeaderValue},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::TransportConfig,
    request::{self, PendingRequest},
    response::DecodedResponse,
};

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("token cannot be sent as a header value: {0}")]
    InvalidToken(#[from] InvalidHeaderValue),

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),
}

impl ExecuteError {
    /// Whether the failure is transient (timeout or connection failure).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) | Self::BodyRead(e) => e.is_timeout() || e.is_connect(),
            Self::ClientBuild(_) | Self::InvalidToken(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecuteError>;

/// Builds and sends token-authenticated requests against one base URL.
///
/// Holds only immutable configuration. Clones share the underlying
/// connection pool and may be used from several tasks at once.
#[derive(Clone)]
pub struct RequestClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RequestClient {
    /// Creates a client with the default [`TransportConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ExecuteError::ClientBuild` if the TLS backend cannot be
    /// initialized.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, token, TransportConfig::default())
    }

    /// # Errors
    ///
    /// Returns `ExecuteError::ClientBuild` if the reqwest client builder fails.
    pub fn with_config(
        base_url: impl Into<String>,
        token: impl Into<String>,
        config: TransportConfig,
    ) -> Result<Self> {
        let http = crate::build_http_client(&config).map_err(ExecuteError::ClientBuild)?;
        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, method: Method, endpoint: &str) -> request::Result<PendingRequest> {
        PendingRequest::new(method, &self.base_url, endpoint)
    }

    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if the target URL is malformed.
    pub fn get(&self, endpoint: &str) -> request::Result<PendingRequest> {
        self.build(Method::GET, endpoint)
    }

    /// Builds a GET whose query string is encoded from `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target URL is malformed or `params` cannot be
    /// encoded as key/value pairs.
    pub fn get_with<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
    ) -> request::Result<PendingRequest> {
        self.build(Method::GET, endpoint)?.with_query(params)
    }

    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if the target URL is malformed.
    pub fn post(&self, endpoint: &str) -> request::Result<PendingRequest> {
        Ok(self.build(Method::POST, endpoint)?.with_empty_body())
    }

    /// # Errors
    ///
    /// Returns an error if the target URL is malformed or `params` cannot be
    /// serialized to JSON.
    pub fn post_with<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
    ) -> request::Result<PendingRequest> {
        self.build(Method::POST, endpoint)?.with_json(params)
    }

    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if the target URL is malformed.
    pub fn put(&self, endpoint: &str) -> request::Result<PendingRequest> {
        Ok(self.build(Method::PUT, endpoint)?.with_empty_body())
    }

    /// # Errors
    ///
    /// Returns an error if the target URL is malformed or `params` cannot be
    /// serialized to JSON.
    pub fn put_with<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
    ) -> request::Result<PendingRequest> {
        self.build(Method::PUT, endpoint)?.with_json(params)
    }

    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if the target URL is malformed.
    pub fn patch(&self, endpoint: &str) -> request::Result<PendingRequest> {
        Ok(self.build(Method::PATCH, endpoint)?.with_empty_body())
    }

    /// # Errors
    ///
    /// Returns an error if the target URL is malformed or `params` cannot be
    /// serialized to JSON.
    pub fn patch_with<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
    ) -> request::Result<PendingRequest> {
        self.build(Method::PATCH, endpoint)?.with_json(params)
    }

    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if the target URL is malformed.
    pub fn delete(&self, endpoint: &str) -> request::Result<PendingRequest> {
        Ok(self.build(Method::DELETE, endpoint)?.with_empty_body())
    }

    /// # Errors
    ///
    /// Returns an error if the target URL is malformed or `params` cannot be
    /// serialized to JSON.
    pub fn delete_with<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &P,
    ) -> request::Result<PendingRequest> {
        self.build(Method::DELETE, endpoint)?.with_json(params)
    }

    /// Sends `request` with the `Accept` and `Authorization` headers set and
    /// drains the whole response body.
    ///
    /// Any status code, including 4xx and 5xx, is returned as a response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The token is not a valid header value
    /// - The connection, TLS handshake, or request times out or fails
    /// - The response body stream fails before it is fully read
    pub async fn execute(&self, request: PendingRequest) -> Result<DecodedResponse> {
        let PendingRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::try_from(format!("Token {}", self.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        // An empty body is framing only: `Content-Length: 0` on POST, PUT and
        // PATCH, nothing on the other methods.
        let body = match body {
            Some(body) if body.is_empty() => {
                if sends_empty_length(&method) {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
                }
                None
            }
            body => body,
        };

        let body_len = body.as_ref().map_or(0, Vec::len);
        debug!(
            %method,
            %url,
            headers = ?redacted(&headers),
            body_len,
            "sending request"
        );
        if let Some(body) = &body {
            trace!(body = %String::from_utf8_lossy(body), "request body");
        }

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(ExecuteError::Transport)?;

        let status_code = response.status();
        let headers = response.headers().clone();
        let content_length = response.content_length();

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ExecuteError::BodyRead)?;
            body.extend_from_slice(&chunk);
        }

        debug!(
            %method,
            %url,
            status = status_code.as_u16(),
            elapsed = ?start.elapsed(),
            "request completed"
        );

        Ok(DecodedResponse {
            status: status_line(status_code),
            status_code: status_code.as_u16(),
            headers,
            content_length,
            body,
        })
    }
}

fn sends_empty_length(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

fn redacted(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token [redacted]"));
    }
    headers
}
