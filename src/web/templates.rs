//! Page templates compiled into the binary.

use anyhow::{Context, Result};
use tera::Tera;

pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../templates/base.html")),
        ("index.html", include_str!("../../templates/index.html")),
        ("converted.html", include_str!("../../templates/converted.html")),
        ("analysis.html", include_str!("../../templates/analysis.html")),
    ])
    .context("Failed to load page templates")?;
    Ok(tera)
}
