use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error};

use crate::core::error::{FetchError, FetchResult};

const USER_AGENT: &str = concat!("fxledger/", env!("CARGO_PKG_VERSION"));

/// GET-with-query client shared by the upstream providers.
#[derive(Debug, Clone)]
pub struct RequestClient {
    provider: &'static str,
    client: reqwest::Client,
}

impl RequestClient {
    pub fn new(provider: &'static str) -> FetchResult<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(RequestClient { provider, client })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Performs one GET and returns the body parsed as JSON, unvalidated.
    pub async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> FetchResult<Value> {
        let url = Url::parse_with_params(endpoint, params).map_err(|e| FetchError::Malformed {
            provider: self.provider,
            reason: format!("invalid endpoint {endpoint}: {e}"),
        })?;
        // Query strings carry API keys, only the path is logged
        debug!("Requesting {} {}", self.provider, url.path());

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Request to {} {} failed: {}", self.provider, url.path(), e);
            FetchError::Transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                provider: self.provider,
                message: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            error!("{} answered {} for {}", self.provider, status, url.path());
            return Err(FetchError::Status {
                url: url.path().to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Malformed {
            provider: self.provider,
            reason: format!("invalid JSON from {}: {e}", url.path()),
        })
    }

    /// Decodes an already fetched body into a typed response.
    pub fn decode<T: serde::de::DeserializeOwned>(&self, body: Value) -> FetchResult<T> {
        serde_json::from_value(body).map_err(|e| FetchError::Malformed {
            provider: self.provider,
            reason: e.to_string(),
        })
    }
}
