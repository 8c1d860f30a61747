//! Output formatting and persistence for predictions.
//!
//! Supports pretty-printing, JSON serialization, and writing JSON to a file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::pipeline::StatePrediction;

/// Logs predictions using Rust's debug pretty-print format.
pub fn print_pretty(predictions: &[StatePrediction]) {
    debug!("{:#?}", predictions);
}

/// Renders any serializable value as indented JSON.
pub fn render_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Writes `value` as indented JSON to `path`, creating parent directories.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let body = render_json(value)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "JSON written");
    Ok(())
}

/// One line per state with its average, e.g. `CA California               37.12`.
pub fn summary_lines(predictions: &[StatePrediction]) -> Vec<String> {
    predictions
        .iter()
        .map(|p| {
            let avg = p.predictions.get(crate::pipeline::AVG_KEY).unwrap_or_default();
            format!("{} {:<24} {:>6.2}", p.state, p.state_full, avg)
        })
        .collect()
}
