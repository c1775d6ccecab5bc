//! JSON point-lookup client backed by `reqwest`.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;

use chainview_core::error::LookupError;
use chainview_core::lookup::JsonFetcher;

use crate::config::HttpClientConfig;

/// Fetches single JSON documents for the detail views.
#[derive(Debug, Clone)]
pub struct HttpJsonFetcher {
    http: reqwest::Client,
}

impl HttpJsonFetcher {
    pub fn new(config: &HttpClientConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl JsonFetcher for HttpJsonFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Option<Value>, LookupError> {
        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Http {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}
