use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::currency::RateProvider;
use crate::core::error::{FetchError, FetchResult};
use crate::providers::request::RequestClient;

/// Historical rates from Open Exchange Rates.
pub struct OpenExchangeRatesProvider {
    base_url: String,
    app_id: String,
    client: RequestClient,
}

impl OpenExchangeRatesProvider {
    pub fn new(base_url: &str, app_id: &str) -> FetchResult<Self> {
        Ok(OpenExchangeRatesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            client: RequestClient::new("open_exchange_rates")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    rates: HashMap<String, f64>,
}

fn check_error(body: &Value) -> FetchResult<()> {
    if body.get("error").and_then(Value::as_bool) != Some(true) {
        return Ok(());
    }
    let message = body
        .get("description")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    if body.get("status").and_then(Value::as_u64) == Some(429) {
        return Err(FetchError::RateLimited {
            provider: "open_exchange_rates",
            message,
        });
    }
    Err(FetchError::Malformed {
        provider: "open_exchange_rates",
        reason: message,
    })
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    #[instrument(
        name = "OpenExchangeRatesFetch",
        skip(self),
        fields(currency = %currency, date = %date)
    )]
    async fn usd_rate(&self, currency: &str, date: NaiveDate) -> FetchResult<f64> {
        let url = format!(
            "{}/api/historical/{}.json",
            self.base_url,
            date.format("%Y-%m-%d")
        );
        let body = self
            .client
            .get_json(
                &url,
                &[
                    ("app_id", self.app_id.as_str()),
                    ("symbols", currency),
                    ("base", "USD"),
                ],
            )
            .await?;
        check_error(&body)?;

        let response: HistoricalResponse = self.client.decode(body)?;
        let rate = response
            .rates
            .get(currency)
            .copied()
            .ok_or_else(|| FetchError::MissingRate {
                currency: currency.to_string(),
                date,
            })?;
        debug!("USD/{} on {} is {}", currency, date, rate);
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(date: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/historical/{date}.json")))
            .and(query_param("app_id", "secret"))
            .and(query_param("symbols", "JPY"))
            .and(query_param("base", "USD"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 2).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let body = r#"{"base": "USD", "timestamp": 1583193600, "rates": {"JPY": 108.1234}}"#;
        let mock_server = create_mock_server("2020-03-02", 200, body).await;

        let provider = OpenExchangeRatesProvider::new(&mock_server.uri(), "secret").unwrap();
        let rate = provider.usd_rate("JPY", day()).await.unwrap();
        assert_eq!(rate, 108.1234);
    }

    #[tokio::test]
    async fn test_rate_missing_from_response() {
        let mock_server = create_mock_server("2020-03-02", 200, r#"{"rates": {}}"#).await;

        let provider = OpenExchangeRatesProvider::new(&mock_server.uri(), "secret").unwrap();
        let err = provider.usd_rate("JPY", day()).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingRate { .. }));
    }

    #[tokio::test]
    async fn test_error_payload() {
        let body = r#"{"error": true, "status": 401, "message": "invalid_app_id", "description": "Invalid App ID"}"#;
        let mock_server = create_mock_server("2020-03-02", 200, body).await;

        let provider = OpenExchangeRatesProvider::new(&mock_server.uri(), "secret").unwrap();
        let err = provider.usd_rate("JPY", day()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid App ID"));
        assert!(!err.is_soft());
    }
}
