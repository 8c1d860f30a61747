//! Feature encoding: one-hot categories with a passthrough year, then standard scaling.
//!
//! Column layout is `[state one-hot.., incident one-hot.., fiscal_year]`, with
//! categories sorted lexicographically.

use anyhow::{Result, bail};
use ndarray::{Array1, Array2, Axis};

use crate::pipeline::types::OccurrenceRow;

/// One-hot encoder for the `state` and `incident_type` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    states: Vec<String>,
    incidents: Vec<String>,
}

impl OneHotEncoder {
    /// Learns the category vocabularies from the training rows.
    pub fn fit(rows: &[OccurrenceRow]) -> Result<Self> {
        if rows.is_empty() {
            bail!("cannot fit encoder on an empty table");
        }

        let mut states: Vec<String> = rows.iter().map(|r| r.state.clone()).collect();
        states.sort_unstable();
        states.dedup();

        let mut incidents: Vec<String> = rows.iter().map(|r| r.incident_type.clone()).collect();
        incidents.sort_unstable();
        incidents.dedup();

        Ok(Self { states, incidents })
    }

    pub fn n_features(&self) -> usize {
        self.states.len() + self.incidents.len() + 1
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn incidents(&self) -> &[String] {
        &self.incidents
    }

    /// Encodes a single `(state, year, incident)` triple.
    ///
    /// # Errors
    ///
    /// Fails when `state` or `incident` was not seen during [`OneHotEncoder::fit`].
    pub fn encode(&self, state: &str, year: i32, incident: &str) -> Result<Array1<f64>> {
        let Ok(s) = self.states.binary_search_by(|c| c.as_str().cmp(state)) else {
            bail!("unknown category {state:?} in column state");
        };
        let Ok(i) = self.incidents.binary_search_by(|c| c.as_str().cmp(incident)) else {
            bail!("unknown category {incident:?} in column incident_type");
        };

        let mut out = Array1::<f64>::zeros(self.n_features());
        out[s] = 1.0;
        out[self.states.len() + i] = 1.0;
        out[self.n_features() - 1] = f64::from(year);
        Ok(out)
    }

    /// Encodes every row into an `(n_rows, n_features)` matrix.
    pub fn transform(&self, rows: &[OccurrenceRow]) -> Result<Array2<f64>> {
        let mut out = Array2::<f64>::zeros((rows.len(), self.n_features()));
        for (mut line, row) in out.axis_iter_mut(Axis(0)).zip(rows) {
            let encoded = self.encode(&row.state, row.fiscal_year, &row.incident_type)?;
            line.assign(&encoded);
        }
        Ok(out)
    }
}

/// Per-column standardization to zero mean and unit variance.
///
/// Columns with zero variance keep a scale of 1 so they are only centred.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let Some(mean) = x.mean_axis(Axis(0)) else {
            bail!("cannot fit scaler on an empty matrix");
        };
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 { 1.0 } else { s });
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }

    pub fn transform_one(&self, x: &Array1<f64>) -> Array1<f64> {
        (x - &self.mean) / &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn row(state: &str, year: i32, incident: &str, occurred: u8) -> OccurrenceRow {
        OccurrenceRow {
            state: state.to_string(),
            fiscal_year: year,
            incident_type: incident.to_string(),
            occurred,
        }
    }

    fn rows() -> Vec<OccurrenceRow> {
        vec![
            row("TX", 2017, "Hurricane", 1),
            row("TX", 2017, "Flood", 0),
            row("AL", 2011, "Hurricane", 0),
            row("AL", 2011, "Flood", 1),
        ]
    }

    #[test]
    fn test_encoder_layout() {
        let enc = OneHotEncoder::fit(&rows()).unwrap();

        assert_eq!(enc.states(), ["AL", "TX"]);
        assert_eq!(enc.incidents(), ["Flood", "Hurricane"]);
        assert_eq!(enc.n_features(), 5);

        let v = enc.encode("TX", 2030, "Flood").unwrap();
        assert_eq!(v, array![0.0, 1.0, 1.0, 0.0, 2030.0]);
    }

    #[test]
    fn test_encoder_rejects_unknown_category() {
        let enc = OneHotEncoder::fit(&rows()).unwrap();
        assert!(enc.encode("CA", 2030, "Flood").is_err());
        assert!(enc.encode("TX", 2030, "Volcano").is_err());
    }

    #[test]
    fn test_encoder_empty_fails() {
        assert!(OneHotEncoder::fit(&[]).is_err());
    }

    #[test]
    fn test_transform_matches_encode() {
        let rows = rows();
        let enc = OneHotEncoder::fit(&rows).unwrap();
        let x = enc.transform(&rows).unwrap();

        assert_eq!(x.dim(), (4, 5));
        assert_eq!(x.row(2), enc.encode("AL", 2011, "Hurricane").unwrap());
    }

    #[test]
    fn test_scaler_standardizes_columns() {
        let x = array![[1.0, 10.0, 5.0], [3.0, 20.0, 5.0], [5.0, 30.0, 5.0]];
        let sc = StandardScaler::fit(&x).unwrap();
        let z = sc.transform(&x);

        for col in z.axis_iter(Axis(1)).take(2) {
            assert!(col.sum().abs() < 1e-12);
            let var = col.mapv(|v| v * v).sum() / 3.0;
            assert!((var - 1.0).abs() < 1e-12);
        }
        // constant column is centred, not divided by zero
        assert!(z.column(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_scaler_transform_one_matches_batch() {
        let x = array![[1.0, 2.0], [3.0, 8.0]];
        let sc = StandardScaler::fit(&x).unwrap();
        let batch = sc.transform(&x);
        let single = sc.transform_one(&x.row(1).to_owned());
        assert_eq!(batch.row(1), single);
    }
}
