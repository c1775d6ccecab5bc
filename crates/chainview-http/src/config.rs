//! HTTP client configuration.

use std::time::Duration;

use chainview_core::ExplorerConfig;

/// Configuration shared by [`HttpStreamSource`](crate::HttpStreamSource) and
/// [`HttpJsonFetcher`](crate::HttpJsonFetcher).
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Bound on a whole point-lookup request. Never applied to streams.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("chainview/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl From<&ExplorerConfig> for HttpClientConfig {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            ..Self::default()
        }
    }
}
