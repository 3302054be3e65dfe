//! Markdown rendering of the dashboard snapshot.
//!
//! # Layout
//!
//! ```text
//! # Агро-панель
//! _Updated ..._
//! ## Ticker
//! ## Sentiment
//! ## Hot
//! ## <category label>      (one per category, scheduling order)
//! ## System log
//! ```

use crate::outputs::json::write_atomically;
use crate::render::DashboardSnapshot;
use std::error::Error;
use std::fmt::{self, Write};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// File name of the page inside the Markdown output directory.
pub const DASHBOARD_FILE: &str = "dashboard.md";

/// Render the whole snapshot as a single Markdown page.
pub fn dashboard_to_markdown(snapshot: &DashboardSnapshot) -> Result<String, fmt::Error> {
    let mut md = String::new();

    writeln!(md, "# Агро-панель\n")?;
    if let Some(updated_at) = snapshot.updated_at {
        writeln!(md, "_Updated {}_\n", updated_at.to_rfc3339())?;
    }

    if let Some(ticker) = &snapshot.ticker {
        writeln!(md, "## Ticker\n\n{}\n", ticker.text())?;
    }

    if let Some(sentiment) = snapshot.sentiment {
        writeln!(md, "## Sentiment\n")?;
        writeln!(md, "- Ріст: {}%", sentiment.positive_percent)?;
        writeln!(md, "- Ризики: {}%\n", sentiment.negative_percent)?;
    }

    if !snapshot.hot.is_empty() {
        writeln!(md, "## Hot\n")?;
        for item in &snapshot.hot {
            writeln!(
                md,
                "- `{} // {}` [{}]({})",
                item.time_label, item.category_label, item.title, item.link
            )?;
        }
        writeln!(md)?;
    }

    for panel in snapshot.categories.values() {
        writeln!(md, "## {}\n", panel.view.label)?;
        if let Some(image) = &panel.lead_image {
            writeln!(md, "![{}]({})\n", panel.view.label, image)?;
        }
        for item in &panel.view.items {
            writeln!(md, "### [{}]({})\n", item.title, item.link)?;
            writeln!(md, "_{} // {}_\n", panel.view.label, item.relative_time)?;
            writeln!(md, "{}\n", item.snippet)?;
        }
    }

    if !snapshot.log.is_empty() {
        writeln!(md, "## System log\n")?;
        for entry in &snapshot.log {
            writeln!(md, "- `[{}]` {}", entry.time, entry.message)?;
        }
    }

    Ok(md)
}

/// Write the page to `{markdown_output_dir}/dashboard.md`.
#[instrument(level = "debug", skip_all, fields(%markdown_output_dir))]
pub async fn write_dashboard(
    snapshot: &DashboardSnapshot,
    markdown_output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let md = dashboard_to_markdown(snapshot)?;
    fs::create_dir_all(markdown_output_dir).await?;
    let path = Path::new(markdown_output_dir).join(DASHBOARD_FILE);
    write_atomically(&path, md.as_bytes()).await?;
    info!(path = %path.display(), "Wrote dashboard Markdown");
    Ok(())
}
