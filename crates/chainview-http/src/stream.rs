//! Streaming NDJSON source backed by `reqwest`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;

use chainview_core::error::StreamError;
use chainview_core::source::{ByteStream, NdjsonSource, NDJSON_CONTENT_TYPE};

use crate::config::HttpClientConfig;

/// Opens `GET` requests on streaming endpoints and hands back the raw body.
///
/// The client only bounds connection setup: a stream is open-ended and may sit
/// idle between records for as long as the backend likes.
#[derive(Debug, Clone)]
pub struct HttpStreamSource {
    http: reqwest::Client,
}

impl HttpStreamSource {
    pub fn new(config: &HttpClientConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { http })
    }

    /// Reuse an existing client. Its timeouts apply to the whole stream.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl NdjsonSource for HttpStreamSource {
    async fn open(&self, url: &str) -> Result<ByteStream, StreamError> {
        let resp = self
            .http
            .get(url)
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StreamError::Http {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Err(StreamError::MissingBody);
        }

        tracing::debug!(url, status = status.as_u16(), "stream response headers received");

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Read(e.to_string())));
        Ok(body.boxed())
    }
}
