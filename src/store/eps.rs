use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::info;

use super::Store;
use crate::core::earnings::{EPS_QUARTERS, EpsQuarter, EpsRecord};
use crate::core::error::{StoreError, StoreResult};

const EPS_DDL: &str = "CREATE TABLE IF NOT EXISTS EPS (
    Symbol TEXT PRIMARY KEY NOT NULL,
    EPS1Date TEXT, EPS1Reported REAL, EPS1Expected REAL,
    EPS2Date TEXT, EPS2Reported REAL, EPS2Expected REAL,
    EPS3Date TEXT, EPS3Reported REAL, EPS3Expected REAL,
    EPS4Date TEXT, EPS4Reported REAL, EPS4Expected REAL,
    LastUpdate TEXT NOT NULL,
    FOREIGN KEY (Symbol) REFERENCES Companies (Symbol)
)";

fn quarter_from_row(row: &SqliteRow, n: usize) -> StoreResult<EpsQuarter> {
    Ok(EpsQuarter {
        fiscal_date: row.try_get::<NaiveDate, _>(format!("EPS{n}Date").as_str())?,
        reported: row.try_get(format!("EPS{n}Reported").as_str())?,
        expected: row.try_get(format!("EPS{n}Expected").as_str())?,
    })
}

fn record_from_row(row: &SqliteRow) -> StoreResult<EpsRecord> {
    let [q1, q2, q3, q4] = [1, 2, 3, 4].map(|n| quarter_from_row(row, n));
    Ok(EpsRecord {
        symbol: row.try_get("Symbol")?,
        quarters: [q1?, q2?, q3?, q4?],
        last_update: row.try_get("LastUpdate")?,
    })
}

impl Store {
    async fn ensure_eps_table(&self) -> StoreResult<()> {
        self.ensure_companies_table().await?;
        self.ensure_table("EPS", EPS_DDL).await
    }

    pub async fn eps(&self, symbol: &str) -> StoreResult<Option<EpsRecord>> {
        self.ensure_eps_table().await?;
        let row = sqlx::query("SELECT * FROM EPS WHERE Symbol = ?")
            .bind(symbol)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    /// Swaps the stored record for `record` in one transaction. Fails with
    /// [`StoreError::ForeignKey`] when the company is unknown, leaving the
    /// table untouched.
    pub async fn replace_eps(&self, record: &EpsRecord) -> StoreResult<()> {
        self.ensure_eps_table().await?;
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM EPS WHERE Symbol = ?")
            .bind(&record.symbol)
            .execute(&mut *tx)
            .await?;

        let mut insert = sqlx::query(
            "INSERT INTO EPS (Symbol,
                EPS1Date, EPS1Reported, EPS1Expected,
                EPS2Date, EPS2Reported, EPS2Expected,
                EPS3Date, EPS3Reported, EPS3Expected,
                EPS4Date, EPS4Reported, EPS4Expected,
                LastUpdate)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.symbol);
        for quarter in &record.quarters {
            insert = insert
                .bind(quarter.fiscal_date)
                .bind(quarter.reported)
                .bind(quarter.expected);
        }
        insert
            .bind(record.last_update)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_insert(e, "EPS", &record.symbol))?;

        tx.commit().await?;
        info!(
            "Stored {} EPS quarters for {}",
            EPS_QUARTERS, record.symbol
        );
        Ok(())
    }

    pub async fn eps_count(&self) -> StoreResult<i64> {
        self.count_rows("EPS").await
    }
}
