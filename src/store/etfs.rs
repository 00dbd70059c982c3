use chrono::NaiveDate;
use tracing::info;

use super::Store;
use crate::core::error::StoreResult;
use crate::core::listing::{Etf, EtfSet};

const ETFS_DDL: &str = "CREATE TABLE IF NOT EXISTS ETFs (
    Symbol TEXT PRIMARY KEY NOT NULL,
    Name TEXT,
    Exchange TEXT,
    LastUpdate TEXT NOT NULL
)";

impl Store {
    pub async fn all_etfs(&self) -> StoreResult<EtfSet> {
        self.ensure_table("ETFs", ETFS_DDL).await?;
        let rows: Vec<(String, Option<String>, Option<String>, NaiveDate)> =
            sqlx::query_as("SELECT Symbol, Name, Exchange, LastUpdate FROM ETFs ORDER BY Symbol")
                .fetch_all(self.pool())
                .await?;

        // The set is refilled as a whole, so the oldest stamp dates it
        let last_update = rows.iter().map(|row| row.3).min();
        let etfs = rows
            .into_iter()
            .map(|(symbol, name, exchange, _)| Etf {
                symbol,
                name: name.unwrap_or_default(),
                exchange: exchange.unwrap_or_default(),
            })
            .collect();
        Ok(EtfSet { etfs, last_update })
    }

    /// Deletes every ETF and inserts `etfs` stamped with `today`, atomically.
    pub async fn replace_etfs(&self, etfs: &[Etf], today: NaiveDate) -> StoreResult<()> {
        self.ensure_table("ETFs", ETFS_DDL).await?;
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM ETFs").execute(&mut *tx).await?;
        for etf in etfs {
            sqlx::query(
                "INSERT OR REPLACE INTO ETFs (Symbol, Name, Exchange, LastUpdate) VALUES (?, ?, ?, ?)",
            )
            .bind(&etf.symbol)
            .bind(&etf.name)
            .bind(&etf.exchange)
            .bind(today)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!("Replaced ETF list with {} entries", etfs.len());
        Ok(())
    }

    pub async fn etf_count(&self) -> StoreResult<i64> {
        self.count_rows("ETFs").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_utils::temp_store;

    fn etf(symbol: &str) -> Etf {
        Etf {
            symbol: symbol.to_string(),
            name: format!("{symbol} fund"),
            exchange: "NYSE Arca".to_string(),
        }
    }

    #[tokio::test]
    async fn test_replace_drops_old_rows() {
        let (_dir, store) = temp_store().await;
        let first = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let second = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();

        let empty = store.all_etfs().await.unwrap();
        assert!(empty.etfs.is_empty());
        assert_eq!(empty.last_update, None);

        store
            .replace_etfs(&[etf("SPY"), etf("QQQ")], first)
            .await
            .unwrap();
        store.replace_etfs(&[etf("VTI")], second).await.unwrap();

        let set = store.all_etfs().await.unwrap();
        assert_eq!(set.etfs, vec![etf("VTI")]);
        assert_eq!(set.last_update, Some(second));
        assert_eq!(store.etf_count().await.unwrap(), 1);
    }
}
