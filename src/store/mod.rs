//! SQLite store for rates, listings, earnings and price history, plus the
//! JSON file cache used for news.
//!
//! Table names cannot be bound as parameters, so the per-currency and
//! per-year tables are only ever named through [`rates_table`] and
//! [`history_table`], which reject anything but the expected shapes.

pub mod companies;
pub mod eps;
pub mod etfs;
pub mod history;
pub mod json_cache;
pub mod rates;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::core::currency::is_currency_code;
use crate::core::error::{StoreError, StoreResult};

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens the database file, creating it when missing. Foreign keys are
    /// enforced on every pooled connection.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        debug!("Opening database at {}", path.display());
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Store { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn table_exists(&self, name: &str) -> StoreResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Runs `ddl` when `name` does not exist yet.
    async fn ensure_table(&self, name: &str, ddl: &str) -> StoreResult<()> {
        if self.table_exists(name).await? {
            return Ok(());
        }
        sqlx::query(ddl).execute(&self.pool).await?;
        info!("Created table {}", name);
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> StoreResult<i64> {
        if !self.table_exists(table).await? {
            return Ok(0);
        }
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// `Rates<CCY>` for a three letter upper-case currency code.
pub fn rates_table(currency: &str) -> StoreResult<String> {
    if !is_currency_code(currency) {
        return Err(StoreError::InvalidTableName(format!("Rates{currency}")));
    }
    Ok(format!("Rates{currency}"))
}

/// `History<YYYY>` for a four digit year.
pub fn history_table(year: i32) -> StoreResult<String> {
    if !(1000..=9999).contains(&year) {
        return Err(StoreError::InvalidTableName(format!("History{year}")));
    }
    Ok(format!("History{year}"))
}
