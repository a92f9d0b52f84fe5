use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TCP_KEEPALIVE: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

/// Timeouts applied to every request sent through a [`crate::RequestClient`].
///
/// `request_timeout` bounds the whole round trip, from connecting until the
/// response body has been drained.
///
/// reqwest has a single deadline for its connector, covering the TCP connect
/// and the TLS handshake together. It is set to `connect_timeout +
/// tls_handshake_timeout`, so a slow handshake is not cut off at the TCP
/// connect deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bon::Builder)]
pub struct TransportConfig {
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,

    #[builder(default = DEFAULT_TLS_HANDSHAKE_TIMEOUT)]
    pub tls_handshake_timeout: Duration,

    #[builder(default = DEFAULT_TCP_KEEPALIVE)]
    pub tcp_keepalive: Duration,

    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
}

impl TransportConfig {
    /// Deadline handed to reqwest for establishing a connection, TLS included.
    #[must_use]
    pub fn connector_timeout(&self) -> Duration {
        self.connect_timeout.saturating_add(self.tls_handshake_timeout)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = TransportConfig::default();

        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.tls_handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.tcp_keepalive, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_builder_overrides_only_given_fields() {
        let config = TransportConfig::builder()
            .request_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.tcp_keepalive, DEFAULT_TCP_KEEPALIVE);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_connector_timeout_includes_tls_handshake() {
        assert_eq!(
            TransportConfig::default().connector_timeout(),
            Duration::from_secs(11)
        );

        let config = TransportConfig::builder()
            .connect_timeout(Duration::from_millis(500))
            .tls_handshake_timeout(Duration::from_secs(2))
            .build();
        assert_eq!(config.connector_timeout(), Duration::from_millis(2500));
    }
}
