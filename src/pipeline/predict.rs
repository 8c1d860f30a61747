//! Per-state incident forecasts for a single fiscal year.

use anyhow::Result;
use tracing::debug;

use crate::pipeline::model::FittedPipeline;
use crate::pipeline::types::{AVG_KEY, IncidentPercentages, StatePrediction};
use crate::pipeline::utility::{mean, round2};
use crate::states::STATES;

/// Predicts, for every one of the 50 states in fixed order, the percentage
/// chance of each common incident in `year`, plus their mean under `"Avg"`.
///
/// The year is not range-checked here.
///
/// # Errors
///
/// Propagates encoder failures, e.g. a state that never appeared in training data.
#[tracing::instrument(skip(pipeline))]
pub fn predict_by_year(pipeline: &FittedPipeline, year: i32) -> Result<Vec<StatePrediction>> {
    let incidents = pipeline.common_incidents();
    let mut predictions = Vec::with_capacity(STATES.len());

    for (code, name) in STATES {
        let mut percentages = Vec::with_capacity(incidents.len() + 1);
        for incident in incidents {
            let p = pipeline.probability(code, year, incident)?;
            percentages.push((incident.clone(), round2(p * 100.0)));
        }

        let values: Vec<f64> = percentages.iter().map(|(_, v)| *v).collect();
        percentages.push((AVG_KEY.to_string(), round2(mean(&values))));

        predictions.push(StatePrediction {
            state: code.to_string(),
            state_full: name.to_string(),
            predictions: IncidentPercentages(percentages),
        });
    }

    debug!(states = predictions.len(), incidents = incidents.len(), "Predictions computed");
    Ok(predictions)
}
