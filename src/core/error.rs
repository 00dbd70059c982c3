//! Error kinds for the store and the upstream fetch layer.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the relational store or the JSON cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Row references a symbol that is not in `Companies`.
    #[error("Foreign key violation inserting {symbol} into {table}")]
    ForeignKey { table: String, symbol: String },

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Cache file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

impl StoreError {
    /// Maps a failed insert to [`StoreError::ForeignKey`] when SQLite rejected it
    /// for referencing an unknown company.
    pub fn from_insert(err: sqlx::Error, table: &str, symbol: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_foreign_key_violation()
        {
            return StoreError::ForeignKey {
                table: table.to_string(),
                symbol: symbol.to_string(),
            };
        }
        StoreError::Database(err)
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, StoreError::ForeignKey { .. })
    }
}

/// Failures raised while fetching from an upstream API and caching the result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error: {status} for {url}")]
    Status { url: String, status: u16 },

    /// The upstream throttled us, either by status code or by replacing the
    /// payload with a notice.
    #[error("{provider} rate limit reached: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },

    /// The data endpoint answered with an `Error Message` instead of data.
    #[error("Unknown symbol {symbol}: {message}")]
    UnknownSymbol { symbol: String, message: String },

    /// The data endpoint answered without its payload key.
    #[error("{provider} response for {symbol} has no {field:?}")]
    MissingField {
        provider: &'static str,
        symbol: String,
        field: &'static str,
    },

    /// The upstream answered properly but has too few quarters for the symbol.
    #[error("Insufficient history for {symbol}: {found} quarters reported, 4 required")]
    InsufficientHistory { symbol: String, found: usize },

    #[error("Malformed {provider} response: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },

    #[error("No match found for {0}")]
    NotFound(String),

    #[error("No {currency} rate available for {date}")]
    MissingRate { currency: String, date: NaiveDate },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FetchError {
    /// Soft failures are logged and leave the cache as it was.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. }
                | FetchError::InsufficientHistory { .. }
                | FetchError::UnknownSymbol { .. }
                | FetchError::MissingField { .. }
        )
    }
}

impl From<sqlx::Error> for FetchError {
    fn from(err: sqlx::Error) -> Self {
        FetchError::Store(StoreError::Database(err))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_errors() {
        assert!(
            FetchError::RateLimited {
                provider: "alpha_vantage",
                message: "5 calls per minute".to_string()
            }
            .is_soft()
        );
        assert!(
            FetchError::InsufficientHistory {
                symbol: "NEWCO".to_string(),
                found: 2
            }
            .is_soft()
        );
        assert!(
            FetchError::UnknownSymbol {
                symbol: "IBM".to_string(),
                message: "Invalid API call.".to_string()
            }
            .is_soft()
        );
        assert!(
            FetchError::MissingField {
                provider: "alpha_vantage",
                symbol: "IBM".to_string(),
                field: "quarterlyEarnings"
            }
            .is_soft()
        );
        assert!(
            !FetchError::Malformed {
                provider: "fmp",
                reason: "expected a list".to_string()
            }
            .is_soft()
        );
        assert!(!FetchError::NotFound("ZZZZ".to_string()).is_soft());
        assert!(
            !FetchError::Store(StoreError::ForeignKey {
                table: "EPS".to_string(),
                symbol: "CVS".to_string()
            })
            .is_soft()
        );
    }

    #[test]
    fn test_error_messages() {
        let err = FetchError::InsufficientHistory {
            symbol: "NEWCO".to_string(),
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient history for NEWCO: 2 quarters reported, 4 required"
        );

        let err = StoreError::ForeignKey {
            table: "History2020".to_string(),
            symbol: "CVS".to_string(),
        };
        assert!(err.is_foreign_key_violation());
        assert!(err.to_string().contains("History2020"));
    }
}
