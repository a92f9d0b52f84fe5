use std::str::Utf8Error;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not valid JSON for the requested type: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// A fully drained HTTP response.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    /// Status line without the protocol, e.g. `200 OK`.
    pub status: String,
    pub status_code: u16,
    pub headers: HeaderMap,
    /// `None` when the server did not announce a length.
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl DecodedResponse {
    /// Parses the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Json` if the body is not valid JSON or does not
    /// match the shape of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// # Errors
    ///
    /// Returns `DecodeError::Utf8` if the body is not valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
