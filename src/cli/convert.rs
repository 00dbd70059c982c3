use super::ui::{self, StyleType};
use crate::core::config::DataPaths;
use crate::core::currency::RateProvider;
use crate::report::export::write_converted_csv;
use crate::report::{Brokerage, ConvertedLot, convert_lots, parse_ledger, summarize};
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use std::path::Path;

fn lots_table(lots: &[ConvertedLot]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(
        [
            "Symbol",
            "Quantity",
            "Acquired",
            "Cost",
            "Rate",
            "Converted Cost",
            "Sold",
            "Sales",
            "Rate",
            "Converted Sales",
            "Gain&Loss",
        ]
        .map(ui::header_cell),
    );
    for lot in lots {
        table.add_row(vec![
            Cell::new(&lot.symbol),
            ui::number_cell(lot.quantity),
            Cell::new(lot.date_acquired),
            ui::number_cell(lot.cost),
            ui::number_cell(lot.rate_acquired),
            ui::number_cell(lot.converted_cost),
            Cell::new(lot.date_sold),
            ui::number_cell(lot.sales),
            ui::number_cell(lot.rate_sold),
            ui::number_cell(lot.converted_sales),
            ui::gain_loss_cell(lot.gain_loss),
        ]);
    }
    table
}

/// Converts the ledger at `file`, prints the lots with their total and
/// writes the CSV export.
pub async fn run(
    file: &Path,
    brokerage: Brokerage,
    currency: &str,
    rates: &dyn RateProvider,
    paths: &DataPaths,
) -> Result<()> {
    let data = std::fs::read(file)
        .with_context(|| format!("Failed to read ledger: {}", file.display()))?;
    let lots = parse_ledger(&data, brokerage)?;
    if lots.is_empty() {
        println!("No lots found in {}", file.display());
        return Ok(());
    }

    let pb = ui::new_progress_bar(lots.len() as u64 * 2, true)?;
    pb.set_message(format!("USD/{currency} rates"));
    let converted = convert_lots(&lots, currency, rates, || pb.inc(1)).await;
    pb.finish_and_clear();
    let converted = converted?;

    let summary = summarize(&converted);
    let title = match summary.tax_year {
        Some(year) => format!("Realized gain/loss {year} in {currency}"),
        None => format!("Realized gain/loss in {currency}"),
    };
    println!("\n{}", ui::style_text(&title, StyleType::Title));
    println!("{}", lots_table(&converted));
    println!(
        "{} {}",
        ui::style_text("Total:", StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2} {} over {} lots", summary.total_gain_loss, currency, summary.lots),
            ui::amount_style(summary.total_gain_loss)
        )
    );

    write_converted_csv(&converted, &paths.export_csv)?;
    println!(
        "{}",
        ui::style_text(
            &format!("Saved to {}", paths.export_csv.display()),
            StyleType::Subtle
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ledger::tests::{FIRSTRADE, StubRates};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_convert_writes_export() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("ledger.csv");
        std::fs::write(&ledger, FIRSTRADE).unwrap();
        let paths = DataPaths::under(dir.path());
        let rates = StubRates(HashMap::from([
            ("2020-01-15", 110.0),
            ("2020-03-02", 107.0),
            ("2019-06-01", 108.5),
            ("2020-01-10", 109.5),
        ]));

        run(&ledger, Brokerage::Firstrade, "JPY", &rates, &paths)
            .await
            .unwrap();

        let csv = std::fs::read_to_string(&paths.export_csv).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("AAPL,"));
        assert!(rows[2].starts_with("MSFT,"));
    }

    #[tokio::test]
    async fn test_missing_rate_fails_without_export() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("ledger.csv");
        std::fs::write(&ledger, FIRSTRADE).unwrap();
        let paths = DataPaths::under(dir.path());

        let result = run(
            &ledger,
            Brokerage::Firstrade,
            "JPY",
            &StubRates(HashMap::new()),
            &paths,
        )
        .await;
        assert!(result.is_err());
        assert!(!paths.export_csv.exists());
    }
}
