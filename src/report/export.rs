use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::ledger::ConvertedLot;

/// Renders converted lots as CSV, headed by their display column names.
pub fn converted_csv(lots: &[ConvertedLot]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for lot in lots {
        wtr.serialize(lot).context("Failed to write CSV record")?;
    }
    wtr.into_inner().context("Failed to flush CSV writer")
}

/// Replaces the export at `path` through a temporary sibling file.
pub fn write_converted_csv(lots: &[ConvertedLot], path: &Path) -> Result<()> {
    let data = converted_csv(lots)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    std::fs::write(&tmp, data)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    info!("Wrote {} lots to {}", lots.len(), path.display());
    Ok(())
}
