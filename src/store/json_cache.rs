use serde::Serialize;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::core::error::StoreResult;

/// Reads the JSON object at `path`. A missing file is an empty cache.
pub async fn load(path: &Path) -> StoreResult<Map<String, Value>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No cache file at {}", path.display());
            return Ok(Map::new());
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&text)?)
}

/// Writes `cache` with four space indentation through a temporary sibling
/// file, so readers never see a half written document.
pub async fn save(cache: &Map<String, Value>, path: &Path) -> StoreResult<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    cache.serialize(&mut ser)?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &buf).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Saved {} cache entries to {}", cache.len(), path.display());
    Ok(())
}
