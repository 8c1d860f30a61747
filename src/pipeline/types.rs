//! Data types shared by the build, fit and query stages.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Key under which the per-state mean percentage is reported.
pub const AVG_KEY: &str = "Avg";

/// One long-form cell of the occurrence table, also the cache file row format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRow {
    pub state: String,
    #[serde(rename = "fy_declared")]
    pub fiscal_year: i32,
    pub incident_type: String,
    pub occurred: u8,
}

/// The materialized training table plus the frozen common-incident set it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceTable {
    pub(crate) common_incidents: Vec<String>,
    pub(crate) rows: Vec<OccurrenceRow>,
}

impl OccurrenceTable {
    pub fn common_incidents(&self) -> &[String] {
        &self.common_incidents
    }

    pub fn rows(&self) -> &[OccurrenceRow] {
        &self.rows
    }

    /// Number of materialized (state, year) pairs.
    pub fn pair_count(&self) -> usize {
        if self.common_incidents.is_empty() {
            0
        } else {
            self.rows.len() / self.common_incidents.len()
        }
    }

    pub fn positive_count(&self) -> usize {
        self.rows.iter().filter(|r| r.occurred == 1).count()
    }
}

/// Ordered `incident -> percentage` mapping, serialized as a JSON object.
///
/// Order is the common-incident order followed by [`AVG_KEY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentPercentages(pub(crate) Vec<(String, f64)>);

impl IncidentPercentages {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Serialize for IncidentPercentages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Forecast for one state, as returned to HTTP and CLI callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePrediction {
    pub state: String,
    pub state_full: String,
    pub predictions: IncidentPercentages,
}

/// Summary of a fit, logged at startup and exposed on the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
    pub test_accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_serialize_in_insertion_order() {
        let p = IncidentPercentages(vec![
            ("Severe Storm".to_string(), 41.5),
            ("Flood".to_string(), 12.0),
            (AVG_KEY.to_string(), 26.75),
        ]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"Severe Storm":41.5,"Flood":12.0,"Avg":26.75}"#);
    }

    #[test]
    fn test_state_prediction_shape() {
        let sp = StatePrediction {
            state: "AL".to_string(),
            state_full: "Alabama".to_string(),
            predictions: IncidentPercentages(vec![(AVG_KEY.to_string(), 0.0)]),
        };
        let value = serde_json::to_value(&sp).unwrap();
        assert_eq!(value["state"], "AL");
        assert_eq!(value["state_full"], "Alabama");
        assert_eq!(value["predictions"]["Avg"], 0.0);
    }

    #[test]
    fn test_pair_count() {
        let row = |incident: &str, occurred| OccurrenceRow {
            state: "CA".to_string(),
            fiscal_year: 2000,
            incident_type: incident.to_string(),
            occurred,
        };
        let table = OccurrenceTable {
            common_incidents: vec!["Fire".to_string(), "Flood".to_string()],
            rows: vec![row("Fire", 1), row("Flood", 0)],
        };
        assert_eq!(table.pair_count(), 1);
        assert_eq!(table.positive_count(), 1);
    }
}
