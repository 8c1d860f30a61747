//! CSV decoding for raw disaster-declaration records.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::states::is_state;

/// One row of the declarations source. Every other column in the file is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub state: String,
    #[serde(rename = "fy_declared", alias = "year")]
    pub fiscal_year: i32,
    pub incident_type: String,
}

impl DeclarationRecord {
    pub fn new(state: &str, fiscal_year: i32, incident_type: &str) -> Self {
        Self {
            state: state.to_string(),
            fiscal_year,
            incident_type: incident_type.to_string(),
        }
    }
}

/// Decodes declaration records from CSV bytes with a header row.
///
/// # Errors
///
/// Returns an error if a required column is missing or a row does not parse.
pub fn parse_declarations(bytes: &[u8]) -> Result<Vec<DeclarationRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: DeclarationRecord =
            result.with_context(|| format!("malformed declaration at data row {}", line + 1))?;
        records.push(record);
    }

    debug!(rows = records.len(), "Declarations decoded");
    Ok(records)
}

/// Drops rows whose state is not one of the 50 states (territories, tribal codes).
pub fn retain_states(records: Vec<DeclarationRecord>) -> Vec<DeclarationRecord> {
    let before = records.len();
    let kept: Vec<_> = records.into_iter().filter(|r| is_state(&r.state)).collect();
    debug!(before, after = kept.len(), "Filtered to recognized states");
    kept
}
