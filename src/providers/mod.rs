pub mod alpha_vantage;
pub mod fmp;
pub mod open_exchange;
pub mod polygon;
pub mod request;

use std::sync::Arc;

use crate::core::config::ProvidersConfig;
use crate::core::currency::RateProvider;
use crate::core::earnings::EarningsProvider;
use crate::core::error::FetchResult;
use crate::core::listing::ListingProvider;
use crate::core::news::NewsProvider;
use crate::core::price::HistoryProvider;

/// The upstream behind each data domain.
#[derive(Clone)]
pub struct Providers {
    pub rates: Arc<dyn RateProvider>,
    pub listings: Arc<dyn ListingProvider>,
    pub earnings: Arc<dyn EarningsProvider>,
    pub history: Arc<dyn HistoryProvider>,
    pub news: Arc<dyn NewsProvider>,
}

impl Providers {
    pub fn from_config(config: &ProvidersConfig) -> FetchResult<Self> {
        let rates = open_exchange::OpenExchangeRatesProvider::new(
            &config.open_exchange_rates.base_url,
            &config.open_exchange_rates.api_key,
        )?;
        let fmp = fmp::FmpProvider::new(&config.fmp.base_url, &config.fmp.api_key)?;
        let alpha = Arc::new(alpha_vantage::AlphaVantageProvider::new(
            &config.alpha_vantage.base_url,
            &config.alpha_vantage.api_key,
        )?);
        let polygon = polygon::PolygonProvider::new(&config.polygon.base_url, &config.polygon.api_key)?;

        Ok(Providers {
            rates: Arc::new(rates),
            listings: Arc::new(fmp),
            earnings: alpha.clone(),
            history: alpha,
            news: Arc::new(polygon),
        })
    }
}
