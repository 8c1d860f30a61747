use anyhow::{Context, Result};
use tracing::info;

use crate::config::PipelineConfig;
use crate::fetch::load_source;
use crate::pipeline::cache::{read_table, write_table};
use crate::pipeline::model::FittedPipeline;
use crate::pipeline::types::OccurrenceTable;
use crate::records::{parse_declarations, retain_states};

/// Returns the occurrence table from the cache file when present, otherwise
/// builds it from the raw source and writes the cache.
#[tracing::instrument(skip_all, fields(cache = %config.cache_path.display()))]
pub async fn load_or_build_table(config: &PipelineConfig) -> Result<OccurrenceTable> {
    if config.cache_path.exists() {
        let table = read_table(&config.cache_path)?;
        info!(
            rows = table.rows().len(),
            common = ?table.common_incidents(),
            "Loaded occurrence table from cache"
        );
        return Ok(table);
    }

    rebuild_table(config).await
}

/// Builds the occurrence table from the raw source and (re)writes the cache.
#[tracing::instrument(skip_all, fields(input = %config.input))]
pub async fn rebuild_table(config: &PipelineConfig) -> Result<OccurrenceTable> {
    let bytes = load_source(&config.input).await?;
    let mut records = parse_declarations(&bytes)
        .with_context(|| format!("failed to parse declarations from {}", config.input))?;
    if config.filter_states {
        records = retain_states(records);
    }

    let table = OccurrenceTable::build(&records, config.top_k);
    write_table(&config.cache_path, &table)?;

    info!(
        records = records.len(),
        pairs = table.pair_count(),
        positives = table.positive_count(),
        common = ?table.common_incidents(),
        "Built occurrence table"
    );
    Ok(table)
}

/// Runs the whole startup sequence: table build (or cache load) then fit.
pub async fn initialize(config: &PipelineConfig) -> Result<FittedPipeline> {
    let table = load_or_build_table(config).await?;
    FittedPipeline::fit(&table, config)
}
