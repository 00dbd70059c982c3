use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::error::{FetchError, FetchResult};
use crate::core::listing::{Company, Etf, ListingProvider};
use crate::providers::request::RequestClient;

/// ETF list and company search from Financial Modeling Prep.
pub struct FmpProvider {
    base_url: String,
    api_key: String,
    client: RequestClient,
}

impl FmpProvider {
    pub fn new(base_url: &str, api_key: &str) -> FetchResult<Self> {
        Ok(FmpProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: RequestClient::new("fmp")?,
        })
    }

    /// FMP reports failures as an object carrying `Error Message`.
    fn check_error(&self, body: &Value) -> FetchResult<()> {
        let Some(message) = body.get("Error Message").and_then(Value::as_str) else {
            return Ok(());
        };
        if message.contains("Limit") {
            return Err(FetchError::RateLimited {
                provider: self.client.provider(),
                message: message.to_string(),
            });
        }
        Err(FetchError::Malformed {
            provider: self.client.provider(),
            reason: message.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EtfListItem {
    symbol: String,
    name: Option<String>,
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: Option<String>,
    #[serde(alias = "exchangeShortName")]
    exchange_short_name: Option<String>,
}

#[async_trait]
impl ListingProvider for FmpProvider {
    #[instrument(name = "FmpEtfList", skip(self))]
    async fn fetch_etfs(&self) -> FetchResult<Vec<Etf>> {
        let url = format!("{}/api/v3/etf/list", self.base_url);
        let body = self
            .client
            .get_json(&url, &[("apikey", self.api_key.as_str())])
            .await?;
        self.check_error(&body)?;

        let items: Vec<EtfListItem> = self.client.decode(body)?;
        debug!("Received {} ETFs", items.len());
        Ok(items
            .into_iter()
            .map(|item| Etf {
                symbol: item.symbol,
                name: item.name.unwrap_or_default(),
                exchange: item.exchange.unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(name = "FmpCompanySearch", skip(self), fields(symbol = %symbol))]
    async fn fetch_company(&self, symbol: &str) -> FetchResult<Company> {
        let url = format!("{}/api/v3/search", self.base_url);
        let body = self
            .client
            .get_json(
                &url,
                &[
                    ("query", symbol),
                    ("limit", "1"),
                    ("apikey", self.api_key.as_str()),
                ],
            )
            .await?;
        self.check_error(&body)?;

        let items: Vec<SearchItem> = self.client.decode(body)?;
        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(symbol.to_string()))?;

        Ok(Company {
            symbol: symbol.to_string(),
            name: item.name.unwrap_or_default(),
            exchange: item.exchange_short_name.unwrap_or_default(),
        })
    }
}
