//! JSON output of the dashboard snapshot.
//!
//! The snapshot is serialized in full after every render and replaces the
//! previous file. Nothing is ever read back.

use crate::render::DashboardSnapshot;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// File name of the snapshot inside the JSON output directory.
pub const SNAPSHOT_FILE: &str = "dashboard.json";

/// Write a [`DashboardSnapshot`] to `{json_output_dir}/dashboard.json`.
///
/// # Returns
///
/// `Ok(())` on success, or an error if directory creation or file writing fails.
#[instrument(level = "debug", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_snapshot(
    snapshot: &DashboardSnapshot,
    json_output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(%json_output_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = Path::new(json_output_dir).join(SNAPSHOT_FILE);
    write_atomically(&path, json.as_bytes()).await?;
    info!(path = %path.display(), bytes = json.len(), "Wrote dashboard JSON");

    Ok(())
}

/// Write to `{path}.tmp`, then rename over `path`.
pub(crate) async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), Box<dyn Error>> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
