//! Core abstractions shared by the providers, the store and the web layer

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod earnings;
pub mod error;
pub mod freshness;
pub mod listing;
pub mod log;
pub mod news;
pub mod price;

// Re-export main types for cleaner imports
pub use clock::{Clock, FixedClock, SystemClock};
pub use currency::RateProvider;
pub use earnings::{EarningsProvider, EpsQuarter, EpsRecord};
pub use error::{FetchError, FetchResult, StoreError, StoreResult};
pub use listing::{Company, Etf, EtfSet, ListingProvider};
pub use news::{NewsEntry, NewsItem, NewsProvider};
pub use price::{HistoryProvider, PriceBar};
