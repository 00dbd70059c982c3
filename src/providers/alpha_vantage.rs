//! Alpha Vantage: quarterly earnings and daily adjusted prices.
//!
//! The API answers throttled calls with HTTP 200 and a `Note` or
//! `Information` object instead of data, so every body is inspected before
//! it is decoded.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::earnings::{EPS_QUARTERS, EarningsProvider, EpsQuarter};
use crate::core::error::{FetchError, FetchResult};
use crate::core::price::{HistoryProvider, PriceBar};
use crate::providers::request::RequestClient;

const PROVIDER: &str = "alpha_vantage";
const DAILY_SERIES: &str = "Time Series (Daily)";

pub struct AlphaVantageProvider {
    base_url: String,
    api_key: String,
    client: RequestClient,
}

impl AlphaVantageProvider {
    pub fn new(base_url: &str, api_key: &str) -> FetchResult<Self> {
        Ok(AlphaVantageProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: RequestClient::new(PROVIDER)?,
        })
    }

    async fn query(&self, symbol: &str, params: &[(&str, &str)]) -> FetchResult<Value> {
        let url = format!("{}/query", self.base_url);
        let mut query = params.to_vec();
        query.push(("symbol", symbol));
        query.push(("apikey", self.api_key.as_str()));

        let body = self.client.get_json(&url, &query).await?;
        classify(body, symbol)
    }
}

/// Separates throttling notices and unknown symbols from data.
fn classify(body: Value, symbol: &str) -> FetchResult<Value> {
    for key in ["Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(FetchError::RateLimited {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }
    }
    if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
        return Err(FetchError::UnknownSymbol {
            symbol: symbol.to_string(),
            message: message.to_string(),
        });
    }
    Ok(body)
}

/// Throttled or exhausted keys sometimes answer with an empty or unrelated
/// object rather than a notice.
fn require_field(body: &Value, field: &'static str, symbol: &str) -> FetchResult<()> {
    if body.get(field).is_none() {
        return Err(FetchError::MissingField {
            provider: PROVIDER,
            symbol: symbol.to_string(),
            field,
        });
    }
    Ok(())
}

fn malformed(reason: impl Into<String>) -> FetchError {
    FetchError::Malformed {
        provider: PROVIDER,
        reason: reason.into(),
    }
}

fn parse_date(value: &str) -> FetchResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| malformed(format!("bad date {value:?}: {e}")))
}

fn parse_number(value: &str) -> FetchResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| malformed(format!("bad number {value:?}: {e}")))
}

/// `"None"` marks a figure the upstream does not have.
fn parse_optional_number(value: Option<&str>) -> FetchResult<Option<f64>> {
    match value.map(str::trim) {
        None | Some("") | Some("None") => Ok(None),
        Some(v) => parse_number(v).map(Some),
    }
}

#[derive(Debug, Deserialize)]
struct EarningsResponse {
    #[serde(alias = "quarterlyEarnings")]
    quarterly_earnings: Vec<QuarterlyEarning>,
}

#[derive(Debug, Deserialize)]
struct QuarterlyEarning {
    #[serde(alias = "fiscalDateEnding")]
    fiscal_date_ending: String,
    #[serde(alias = "reportedEPS")]
    reported_eps: Option<String>,
    #[serde(alias = "estimatedEPS")]
    estimated_eps: Option<String>,
}

impl QuarterlyEarning {
    fn parse(&self) -> FetchResult<EpsQuarter> {
        Ok(EpsQuarter {
            fiscal_date: parse_date(&self.fiscal_date_ending)?,
            reported: parse_optional_number(self.reported_eps.as_deref())?,
            expected: parse_optional_number(self.estimated_eps.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: HashMap<String, DailyBar>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. adjusted close")]
    adjusted_close: String,
    #[serde(rename = "6. volume")]
    volume: String,
}

impl DailyBar {
    fn parse(&self, date: &str) -> FetchResult<PriceBar> {
        Ok(PriceBar::new(
            parse_date(date)?,
            parse_number(&self.open)?,
            parse_number(&self.high)?,
            parse_number(&self.low)?,
            parse_number(&self.close)?,
            parse_number(&self.volume)? as i64,
            parse_number(&self.adjusted_close)?,
        ))
    }
}

#[async_trait]
impl EarningsProvider for AlphaVantageProvider {
    #[instrument(name = "AlphaVantageEarnings", skip(self), fields(symbol = %symbol))]
    async fn fetch_quarters(&self, symbol: &str) -> FetchResult<[EpsQuarter; EPS_QUARTERS]> {
        let body = self.query(symbol, &[("function", "EARNINGS")]).await?;
        require_field(&body, "quarterlyEarnings", symbol)?;
        let response: EarningsResponse = self.client.decode(body)?;

        let found = response.quarterly_earnings.len();
        if found < EPS_QUARTERS {
            return Err(FetchError::InsufficientHistory {
                symbol: symbol.to_string(),
                found,
            });
        }
        let quarters = response.quarterly_earnings[..EPS_QUARTERS]
            .iter()
            .map(QuarterlyEarning::parse)
            .collect::<FetchResult<Vec<_>>>()?;
        debug!("Parsed {} of {} quarters", quarters.len(), found);

        quarters
            .try_into()
            .map_err(|_| malformed("quarter count changed while parsing"))
    }
}

#[async_trait]
impl HistoryProvider for AlphaVantageProvider {
    #[instrument(name = "AlphaVantageDaily", skip(self), fields(symbol = %symbol))]
    async fn fetch_daily(&self, symbol: &str) -> FetchResult<Vec<PriceBar>> {
        let body = self
            .query(
                symbol,
                &[
                    ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                    ("outputsize", "full"),
                ],
            )
            .await?;
        require_field(&body, DAILY_SERIES, symbol)?;
        let response: DailyResponse = self.client.decode(body)?;

        let bars = response
            .series
            .iter()
            .map(|(date, bar)| bar.parse(date))
            .collect::<FetchResult<Vec<_>>>()?;
        debug!("Parsed {} daily bars", bars.len());
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(function: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", function))
            .and(query_param("apikey", "demo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    const EARNINGS: &str = r#"{
        "symbol": "IBM",
        "annualEarnings": [],
        "quarterlyEarnings": [
            {"fiscalDateEnding": "2020-12-31", "reportedEPS": "2.07", "estimatedEPS": "1.79"},
            {"fiscalDateEnding": "2020-09-30", "reportedEPS": "2.58", "estimatedEPS": "2.6"},
            {"fiscalDateEnding": "2020-06-30", "reportedEPS": "2.18", "estimatedEPS": "None"},
            {"fiscalDateEnding": "2020-03-31", "reportedEPS": "1.84", "estimatedEPS": "1.8"},
            {"fiscalDateEnding": "2019-12-31", "reportedEPS": "4.71", "estimatedEPS": "4.69"}
        ]
    }"#;

    #[tokio::test]
    async fn test_earnings_takes_four_latest() {
        let mock_server = create_mock_server("EARNINGS", EARNINGS).await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();

        let quarters = provider.fetch_quarters("IBM").await.unwrap();
        assert_eq!(
            quarters[0].fiscal_date,
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap()
        );
        assert_eq!(quarters[0].reported, Some(2.07));
        assert_eq!(quarters[2].expected, None);
        assert_eq!(
            quarters[3].fiscal_date,
            NaiveDate::from_ymd_opt(2020, 3, 31).unwrap()
        );
    }

    #[tokio::test]
    async fn test_earnings_insufficient_history() {
        let body = r#"{"quarterlyEarnings": [
            {"fiscalDateEnding": "2020-12-31", "reportedEPS": "0.1", "estimatedEPS": "0.2"}
        ]}"#;
        let mock_server = create_mock_server("EARNINGS", body).await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();

        let err = provider.fetch_quarters("NEWCO").await.unwrap_err();
        assert!(matches!(err, FetchError::InsufficientHistory { found: 1, .. }));
        assert!(err.is_soft());
    }

    #[tokio::test]
    async fn test_throttle_notice_is_rate_limited() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        let mock_server = create_mock_server("EARNINGS", body).await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();

        let err = provider.fetch_quarters("IBM").await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_error_message_is_unknown_symbol() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        let mock_server = create_mock_server("TIME_SERIES_DAILY_ADJUSTED", body).await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();

        let err = provider.fetch_daily("ZZZZ").await.unwrap_err();
        assert!(err.is_soft());
        assert!(matches!(err, FetchError::UnknownSymbol { symbol, .. } if symbol == "ZZZZ"));
    }

    #[tokio::test]
    async fn test_missing_payload_key() {
        let mock_server = create_mock_server("EARNINGS", "{}").await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();

        let err = provider.fetch_quarters("IBM").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingField { field: "quarterlyEarnings", .. }
        ));
        assert!(err.is_soft());

        let mock_server =
            create_mock_server("TIME_SERIES_DAILY_ADJUSTED", r#"{"Meta Data": {}}"#).await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();
        let err = provider.fetch_daily("IBM").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingField { field: DAILY_SERIES, .. }
        ));
    }

    #[tokio::test]
    async fn test_daily_series() {
        let body = r#"{
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2021-01-04": {"1. open": "125.85", "2. high": "125.9174", "3. low": "123.04",
                    "4. close": "123.94", "5. adjusted close": "117.7", "6. volume": "5179161",
                    "7. dividend amount": "0.0000", "8. split coefficient": "1.0"},
                "2020-12-31": {"1. open": "100.0", "2. high": "101.0", "3. low": "99.0",
                    "4. close": "100.0", "5. adjusted close": "95.0", "6. volume": "3000",
                    "7. dividend amount": "0.0000", "8. split coefficient": "1.0"}
            }
        }"#;
        let mock_server = create_mock_server("TIME_SERIES_DAILY_ADJUSTED", body).await;
        let provider = AlphaVantageProvider::new(&mock_server.uri(), "demo").unwrap();

        let mut bars = provider.fetch_daily("IBM").await.unwrap();
        bars.sort_by_key(|bar| bar.date);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].year(), 2020);
        assert!((bars[0].ratio - 0.95).abs() < 1e-9);
        assert_eq!(bars[1].volume, 5_179_161);
    }
}
