use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::core::error::{FetchError, FetchResult};
use crate::core::listing::is_ticker;
use crate::core::news::NewsProvider;
use crate::providers::request::RequestClient;

/// Latest company headlines from Polygon.
pub struct PolygonProvider {
    base_url: String,
    api_key: String,
    client: RequestClient,
}

impl PolygonProvider {
    pub fn new(base_url: &str, api_key: &str) -> FetchResult<Self> {
        Ok(PolygonProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: RequestClient::new("polygon")?,
        })
    }
}

#[async_trait]
impl NewsProvider for PolygonProvider {
    #[instrument(name = "PolygonNews", skip(self), fields(symbol = %symbol))]
    async fn fetch_news(&self, symbol: &str) -> FetchResult<Value> {
        if !is_ticker(symbol) {
            return Err(FetchError::NotFound(symbol.to_string()));
        }
        let url = format!("{}/v1/meta/symbols/{}/news", self.base_url, symbol);
        let body = self
            .client
            .get_json(
                &url,
                &[
                    ("perpage", "5"),
                    ("page", "1"),
                    ("apiKey", self.api_key.as_str()),
                ],
            )
            .await?;

        if let Some(message) = body.get("error").and_then(Value::as_str) {
            return Err(FetchError::Malformed {
                provider: self.client.provider(),
                reason: message.to_string(),
            });
        }
        Ok(body)
    }
}
