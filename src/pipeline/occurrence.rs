//! Deduplication, common-incident selection and the occurrence pivot.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::pipeline::types::{OccurrenceRow, OccurrenceTable};
use crate::records::DeclarationRecord;

/// Collapses repeated `(state, fiscal_year, incident_type)` triples, keeping the first.
pub fn dedup_records(records: &[DeclarationRecord]) -> Vec<DeclarationRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| seen.insert((r.state.as_str(), r.fiscal_year, r.incident_type.as_str())))
        .cloned()
        .collect()
}

/// Returns the `k` most frequent incident types, most frequent first.
///
/// Ties keep the order in which the incident types first appear.
pub fn common_incidents(records: &[DeclarationRecord], k: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for r in records {
        let slot = *index.entry(r.incident_type.as_str()).or_insert_with(|| {
            counts.push((r.incident_type.as_str(), 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }

    // stable: equal counts stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(k);

    counts.into_iter().map(|(name, _)| name.to_string()).collect()
}

impl OccurrenceTable {
    /// Deduplicates `records`, picks the `top_k` common incidents and pivots to
    /// one flag per common incident for every `(state, year)` that has any of them.
    ///
    /// Pairs that only ever saw rare incidents produce no rows at all.
    pub fn build(records: &[DeclarationRecord], top_k: usize) -> Self {
        let deduped = dedup_records(records);
        let common = common_incidents(&deduped, top_k);
        let column: HashMap<&str, usize> = common
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut pairs: Vec<((&str, i32), Vec<u8>)> = Vec::new();
        let mut pair_index: HashMap<(&str, i32), usize> = HashMap::new();

        for r in &deduped {
            let Some(&col) = column.get(r.incident_type.as_str()) else {
                continue;
            };
            let key = (r.state.as_str(), r.fiscal_year);
            let slot = *pair_index.entry(key).or_insert_with(|| {
                pairs.push((key, vec![0; common.len()]));
                pairs.len() - 1
            });
            pairs[slot].1[col] = 1;
        }

        let rows = pairs
            .iter()
            .flat_map(|((state, year), flags)| {
                common
                    .iter()
                    .zip(flags)
                    .map(move |(incident, &occurred)| OccurrenceRow {
                        state: state.to_string(),
                        fiscal_year: *year,
                        incident_type: incident.clone(),
                        occurred,
                    })
            })
            .collect::<Vec<_>>();

        debug!(
            raw = records.len(),
            deduped = deduped.len(),
            pairs = pairs.len(),
            rows = rows.len(),
            ?common,
            "Occurrence table built"
        );

        Self {
            common_incidents: common,
            rows,
        }
    }

    /// Rebuilds a table from long-form rows, e.g. a reloaded cache file.
    ///
    /// The common-incident set is the distinct incident types in first-seen order.
    pub fn from_rows(rows: Vec<OccurrenceRow>) -> Self {
        let mut common_incidents: Vec<String> = Vec::new();
        for row in &rows {
            if !common_incidents.contains(&row.incident_type) {
                common_incidents.push(row.incident_type.clone());
            }
        }
        Self {
            common_incidents,
            rows,
        }
    }
}
