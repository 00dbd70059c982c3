use tracing::info;

use super::Store;
use crate::core::error::StoreResult;
use crate::core::listing::Company;

const COMPANIES_DDL: &str = "CREATE TABLE IF NOT EXISTS Companies (
    Symbol TEXT PRIMARY KEY NOT NULL,
    Name TEXT,
    Exchange TEXT
)";

impl Store {
    /// Creates `Companies`, which EPS and history rows reference.
    pub(crate) async fn ensure_companies_table(&self) -> StoreResult<()> {
        self.ensure_table("Companies", COMPANIES_DDL).await
    }

    pub async fn company(&self, symbol: &str) -> StoreResult<Option<Company>> {
        self.ensure_companies_table().await?;
        let row: Option<(String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT Symbol, Name, Exchange FROM Companies WHERE Symbol = ?")
                .bind(symbol)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(|(symbol, name, exchange)| Company {
            symbol,
            name: name.unwrap_or_default(),
            exchange: exchange.unwrap_or_default(),
        }))
    }

    /// Companies are written once and never updated.
    pub async fn insert_company(&self, company: &Company) -> StoreResult<()> {
        self.ensure_companies_table().await?;
        sqlx::query("INSERT OR IGNORE INTO Companies (Symbol, Name, Exchange) VALUES (?, ?, ?)")
            .bind(&company.symbol)
            .bind(&company.name)
            .bind(&company.exchange)
            .execute(self.pool())
            .await?;
        info!("Stored company {} ({})", company.symbol, company.name);
        Ok(())
    }

    pub async fn company_count(&self) -> StoreResult<i64> {
        self.count_rows("Companies").await
    }
}
