use std::collections::BTreeMap;

use sqlx::Row;
use tracing::info;

use super::{Store, history_table};
use crate::core::error::{StoreError, StoreResult};
use crate::core::price::PriceBar;

impl Store {
    async fn ensure_history_table(&self, year: i32) -> StoreResult<String> {
        self.ensure_companies_table().await?;
        let table = history_table(year)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                Date TEXT NOT NULL,
                Symbol TEXT NOT NULL,
                Open REAL,
                High REAL,
                Low REAL,
                Close REAL,
                Volume INTEGER,
                AdjustedClose REAL,
                Ratio REAL,
                PRIMARY KEY (Date, Symbol),
                FOREIGN KEY (Symbol) REFERENCES Companies (Symbol)
            )"
        );
        self.ensure_table(&table, &ddl).await?;
        Ok(table)
    }

    /// Bars of `symbol` in `year`, oldest first.
    pub async fn history(&self, symbol: &str, year: i32) -> StoreResult<Vec<PriceBar>> {
        let table = self.ensure_history_table(year).await?;
        let rows = sqlx::query(&format!(
            "SELECT Date, Open, High, Low, Close, Volume, AdjustedClose, Ratio
             FROM \"{table}\" WHERE Symbol = ? ORDER BY Date"
        ))
        .bind(symbol)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<PriceBar> {
                Ok(PriceBar {
                    date: row.try_get("Date")?,
                    open: row.try_get("Open")?,
                    high: row.try_get("High")?,
                    low: row.try_get("Low")?,
                    close: row.try_get("Close")?,
                    volume: row.try_get("Volume")?,
                    adjusted_close: row.try_get("AdjustedClose")?,
                    ratio: row.try_get("Ratio")?,
                })
            })
            .collect()
    }

    /// Writes every bar of one fetch in a single transaction, each into the
    /// table of its own year.
    pub async fn insert_history(&self, symbol: &str, bars: &[PriceBar]) -> StoreResult<()> {
        let mut by_year: BTreeMap<i32, Vec<&PriceBar>> = BTreeMap::new();
        for bar in bars {
            by_year.entry(bar.year()).or_default().push(bar);
        }
        let mut tables = BTreeMap::new();
        for year in by_year.keys() {
            tables.insert(*year, self.ensure_history_table(*year).await?);
        }

        let mut tx = self.pool().begin().await?;
        for (year, year_bars) in &by_year {
            let table = &tables[year];
            for bar in year_bars {
                sqlx::query(&format!(
                    "INSERT OR IGNORE INTO \"{table}\"
                     (Date, Symbol, Open, High, Low, Close, Volume, AdjustedClose, Ratio)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(bar.date)
                .bind(symbol)
                .bind(bar.open)
                .bind(bar.high)
                .bind(bar.low)
                .bind(bar.close)
                .bind(bar.volume)
                .bind(bar.adjusted_close)
                .bind(bar.ratio)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::from_insert(e, table, symbol))?;
            }
        }
        tx.commit().await?;
        info!(
            "Stored {} bars for {} across {} years",
            bars.len(),
            symbol,
            by_year.len()
        );
        Ok(())
    }

    pub async fn history_count(&self, year: i32) -> StoreResult<i64> {
        self.count_rows(&history_table(year)?).await
    }
}
