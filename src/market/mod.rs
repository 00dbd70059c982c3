//! Cached access to every upstream data domain.

pub mod cached;
pub mod companies;
pub mod eps;
pub mod etfs;
pub mod history;
pub mod news;
pub mod rates;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::core::clock::Clock;
use crate::core::currency::RateProvider;
use crate::core::earnings::EpsRecord;
use crate::core::error::{FetchError, FetchResult};
use crate::core::listing::{Company, EtfSet};
use crate::core::news::NewsEntry;
use crate::core::price::{HistoryProvider, PriceBar};
use crate::providers::Providers;
use crate::store::Store;

use cached::CachedFetch;
use companies::CompanyEntity;
use eps::EpsEntity;
use etfs::EtfEntity;
use history::{HistoryEntity, bars_for_year};
use news::NewsEntity;
use rates::RateEntity;

pub struct MarketData {
    rates: CachedFetch<RateEntity>,
    etfs: CachedFetch<EtfEntity>,
    companies: CachedFetch<CompanyEntity>,
    eps: CachedFetch<EpsEntity>,
    history: CachedFetch<HistoryEntity>,
    news: CachedFetch<NewsEntity>,
    live_history: Arc<dyn HistoryProvider>,
    clock: Arc<dyn Clock>,
}

impl MarketData {
    pub fn new(
        store: Store,
        providers: Providers,
        news_cache: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rates = RateEntity {
            store: store.clone(),
            provider: providers.rates,
        };
        let etfs = EtfEntity {
            store: store.clone(),
            provider: Arc::clone(&providers.listings),
        };
        let companies = CompanyEntity {
            store: store.clone(),
            provider: providers.listings,
        };
        let eps = EpsEntity {
            store: store.clone(),
            provider: providers.earnings,
        };
        let history = HistoryEntity {
            store,
            provider: Arc::clone(&providers.history),
        };
        let news = NewsEntity::new(news_cache, providers.news);

        MarketData {
            rates: CachedFetch::new(rates, Arc::clone(&clock)),
            etfs: CachedFetch::new(etfs, Arc::clone(&clock)),
            companies: CachedFetch::new(companies, Arc::clone(&clock)),
            eps: CachedFetch::new(eps, Arc::clone(&clock)),
            history: CachedFetch::new(history, Arc::clone(&clock)),
            news: CachedFetch::new(news, Arc::clone(&clock)),
            live_history: providers.history,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn rate(&self, currency: &str, date: NaiveDate) -> FetchResult<f64> {
        self.rates
            .get(&(currency.to_string(), date))
            .await?
            .ok_or_else(|| FetchError::MissingRate {
                currency: currency.to_string(),
                date,
            })
    }

    /// The ETF list, empty when it was never fetched successfully.
    pub async fn etfs(&self) -> FetchResult<EtfSet> {
        Ok(self.etfs.get(&()).await?.unwrap_or_default())
    }

    pub async fn company(&self, symbol: &str) -> FetchResult<Company> {
        self.companies
            .get(&symbol.to_string())
            .await?
            .ok_or_else(|| FetchError::NotFound(symbol.to_string()))
    }

    /// EPS for a company. The company must already be cached.
    pub async fn eps(&self, symbol: &str) -> FetchResult<Option<EpsRecord>> {
        self.eps.get(&symbol.to_string()).await
    }

    /// Cached bars of a company for `year`, oldest first. The company must
    /// already be cached.
    pub async fn history(&self, symbol: &str, year: i32) -> FetchResult<Vec<PriceBar>> {
        Ok(self
            .history
            .get(&(symbol.to_string(), year))
            .await?
            .unwrap_or_default())
    }

    /// Bars for symbols that are not companies, such as ETFs, fetched
    /// without caching.
    #[instrument(skip(self))]
    pub async fn live_history(&self, symbol: &str, year: i32) -> FetchResult<Vec<PriceBar>> {
        match self.live_history.fetch_daily(symbol).await {
            Ok(bars) => Ok(bars_for_year(bars, year)),
            Err(e) if e.is_soft() => {
                warn!("Live history for {} skipped: {}", symbol, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn news(&self, symbol: &str) -> FetchResult<Option<NewsEntry>> {
        self.news.get(&symbol.to_string()).await
    }
}

#[async_trait]
impl RateProvider for MarketData {
    async fn usd_rate(&self, currency: &str, date: NaiveDate) -> FetchResult<f64> {
        self.rate(currency, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::config::{ProviderConfig, ProvidersConfig};
    use crate::store::test_utils::temp_store;
    use chrono::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn providers_for(server: &MockServer) -> Providers {
        let provider = ProviderConfig {
            base_url: server.uri(),
            api_key: "key".to_string(),
        };
        Providers::from_config(&ProvidersConfig {
            open_exchange_rates: provider.clone(),
            fmp: provider.clone(),
            alpha_vantage: provider.clone(),
            polygon: provider,
        })
        .unwrap()
    }

    fn market(store: &Store, server: &MockServer, dir: &TempDir, today: NaiveDate) -> MarketData {
        MarketData::new(
            store.clone(),
            providers_for(server),
            dir.path().join("cached_news.json"),
            Arc::new(FixedClock::on(today)),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn mount_company(server: &MockServer, symbol: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v3/search"))
            .and(query_param("query", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"[{{"symbol": "{symbol}", "name": "{symbol} Corp", "exchangeShortName": "NYSE"}}]"#
            )))
            .mount(server)
            .await;
    }

    fn earnings_body(reported: f64) -> String {
        let quarters: Vec<String> = ["2020-12-31", "2020-09-30", "2020-06-30", "2020-03-31"]
            .iter()
            .map(|d| {
                format!(
                    r#"{{"fiscalDateEnding": "{d}", "reportedEPS": "{reported}", "estimatedEPS": "1.0"}}"#
                )
            })
            .collect();
        format!(r#"{{"quarterlyEarnings": [{}]}}"#, quarters.join(","))
    }

    #[tokio::test]
    async fn test_rate_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/historical/2020-03-02.json"))
            .and(query_param("symbols", "JPY"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"rates": {"JPY": 107.5}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let market = market(&store, &server, &dir, date(2021, 1, 1));

        assert_eq!(market.rate("JPY", date(2020, 3, 2)).await.unwrap(), 107.5);
        assert_eq!(market.usd_rate("JPY", date(2020, 3, 2)).await.unwrap(), 107.5);
        assert_eq!(store.rate_count("JPY").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_etf_list_replaced_after_thirty_days() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/etf/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"symbol": "VTI", "name": "Vanguard Total", "exchange": "NYSE Arca"}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let filled = date(2021, 1, 1);
        store
            .replace_etfs(
                &[crate::core::listing::Etf {
                    symbol: "SPY".to_string(),
                    name: "SPDR".to_string(),
                    exchange: "NYSE Arca".to_string(),
                }],
                filled,
            )
            .await
            .unwrap();

        let young = market(&store, &server, &dir, filled + Duration::days(29));
        assert!(young.etfs().await.unwrap().contains("SPY"));

        let old_enough = market(&store, &server, &dir, filled + Duration::days(30));
        let set = old_enough.etfs().await.unwrap();
        assert!(!set.contains("SPY"));
        assert!(set.contains("VTI"));
        assert_eq!(set.last_update, Some(filled + Duration::days(30)));
    }

    #[tokio::test]
    async fn test_eps_refresh_boundary() {
        let server = MockServer::start().await;
        mount_company(&server, "IBM").await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "EARNINGS"))
            .respond_with(ResponseTemplate::new(200).set_body_string(earnings_body(2.0)))
            .expect(2)
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let first = date(2021, 1, 1);

        let day0 = market(&store, &server, &dir, first);
        day0.company("IBM").await.unwrap();
        let record = day0.eps("IBM").await.unwrap().unwrap();
        assert_eq!(record.last_update, first);

        let day9 = market(&store, &server, &dir, first + Duration::days(9));
        assert_eq!(day9.eps("IBM").await.unwrap().unwrap().last_update, first);

        let day10 = market(&store, &server, &dir, first + Duration::days(10));
        assert_eq!(
            day10.eps("IBM").await.unwrap().unwrap().last_update,
            first + Duration::days(10)
        );
    }

    #[tokio::test]
    async fn test_throttled_eps_keeps_stale_record() {
        let server = MockServer::start().await;
        mount_company(&server, "IBM").await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "EARNINGS"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"Note": "API call frequency is 5 calls per minute"}"#),
            )
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let first = date(2021, 1, 1);
        let day0 = market(&store, &server, &dir, first);
        day0.company("IBM").await.unwrap();
        assert_eq!(day0.eps("IBM").await.unwrap(), None);

        let stale = EpsRecord {
            symbol: "IBM".to_string(),
            quarters: std::array::from_fn(|i| crate::core::earnings::EpsQuarter {
                fiscal_date: date(2020, 3, 31) + Duration::days(91 * i as i64),
                reported: Some(1.0),
                expected: None,
            }),
            last_update: first,
        };
        store.replace_eps(&stale).await.unwrap();

        let later = market(&store, &server, &dir, first + Duration::days(40));
        assert_eq!(later.eps("IBM").await.unwrap(), Some(stale));
    }

    #[tokio::test]
    async fn test_eps_for_unknown_company_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "EARNINGS"))
            .respond_with(ResponseTemplate::new(200).set_body_string(earnings_body(1.0)))
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let market = market(&store, &server, &dir, date(2021, 1, 1));

        let err = market.eps("CVS").await.unwrap_err();
        assert!(matches!(err, FetchError::Store(ref e) if e.is_foreign_key_violation()));
        assert_eq!(store.eps_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_cached_per_year() {
        let server = MockServer::start().await;
        mount_company(&server, "MAR").await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "TIME_SERIES_DAILY_ADJUSTED"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"Time Series (Daily)": {
                    "2020-01-03": {"1. open": "100", "2. high": "110", "3. low": "90", "4. close": "100",
                        "5. adjusted close": "95", "6. volume": "10"},
                    "2020-01-02": {"1. open": "99", "2. high": "101", "3. low": "98", "4. close": "100",
                        "5. adjusted close": "95", "6. volume": "12"},
                    "2019-12-31": {"1. open": "98", "2. high": "99", "3. low": "97", "4. close": "98",
                        "5. adjusted close": "93", "6. volume": "11"}
                }}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let market = market(&store, &server, &dir, date(2021, 6, 1));

        market.company("MAR").await.unwrap();
        let bars = market.history("MAR", 2020).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2020, 1, 2));
        assert_eq!(market.history("MAR", 2020).await.unwrap(), bars);
        assert_eq!(store.history_count(2019).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_news_refetched_daily() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/meta/symbols/AAPL/news"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[{"title": "Apple rallies"}]"#),
            )
            .expect(2)
            .mount(&server)
            .await;
        let (dir, store) = temp_store().await;
        let first = date(2021, 4, 9);

        let day0 = market(&store, &server, &dir, first);
        let entry = day0.news("AAPL").await.unwrap().unwrap();
        assert_eq!(entry.fetched, first);
        assert_eq!(entry.items()[0].title, "Apple rallies");
        day0.news("AAPL").await.unwrap();

        let day1 = market(&store, &server, &dir, first + Duration::days(1));
        assert_eq!(
            day1.news("AAPL").await.unwrap().unwrap().fetched,
            first + Duration::days(1)
        );
    }
}
