pub mod client;
pub mod config;
pub mod request;
pub mod response;

pub use client::{ExecuteError, RequestClient};
pub use config::TransportConfig;
pub use request::{PendingRequest, RequestError};
pub use response::{DecodeError, DecodedResponse};

/// Builds the reqwest client behind a [`RequestClient`].
///
/// # Errors
///
/// Returns an error if the reqwest client builder fails.
pub fn build_http_client(config: &TransportConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("tokenhttp/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.connector_timeout())
        .tcp_keepalive(config.tcp_keepalive)
        .timeout(config.request_timeout)
        .build()
}
