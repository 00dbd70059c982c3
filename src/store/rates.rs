use chrono::NaiveDate;
use tracing::debug;

use super::{Store, rates_table};
use crate::core::error::StoreResult;

impl Store {
    async fn ensure_rates_table(&self, currency: &str) -> StoreResult<String> {
        let table = rates_table(currency)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                Date TEXT PRIMARY KEY NOT NULL,
                Rate REAL NOT NULL
            )"
        );
        self.ensure_table(&table, &ddl).await?;
        Ok(table)
    }

    pub async fn rate(&self, currency: &str, date: NaiveDate) -> StoreResult<Option<f64>> {
        let table = self.ensure_rates_table(currency).await?;
        let rate: Option<f64> =
            sqlx::query_scalar(&format!("SELECT Rate FROM \"{table}\" WHERE Date = ?"))
                .bind(date)
                .fetch_optional(self.pool())
                .await?;
        Ok(rate)
    }

    /// Rates are append only. A second insert for the same day is ignored.
    pub async fn insert_rate(&self, currency: &str, date: NaiveDate, rate: f64) -> StoreResult<()> {
        let table = self.ensure_rates_table(currency).await?;
        sqlx::query(&format!(
            "INSERT OR IGNORE INTO \"{table}\" (Date, Rate) VALUES (?, ?)"
        ))
        .bind(date)
        .bind(rate)
        .execute(self.pool())
        .await?;
        debug!("Stored USD/{} {} for {}", currency, rate, date);
        Ok(())
    }

    pub async fn rate_count(&self, currency: &str) -> StoreResult<i64> {
        self.count_rows(&rates_table(currency)?).await
    }
}
