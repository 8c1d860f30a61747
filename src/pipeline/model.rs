//! The fitted bundle: encoder, scaler and RBF support-vector classifier.

use anyhow::{Result, anyhow, bail};
use linfa::dataset::Pr;
use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, Axis};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::pipeline::encode::{OneHotEncoder, StandardScaler};
use crate::pipeline::split::train_test_split;
use crate::pipeline::types::{FitReport, OccurrenceRow, OccurrenceTable};
use crate::pipeline::utility::{mean, variance};

/// Everything needed to answer queries, fit once and never mutated afterwards.
pub struct FittedPipeline {
    common_incidents: Vec<String>,
    encoder: OneHotEncoder,
    scaler: StandardScaler,
    classifier: Svm<f64, Pr>,
    report: FitReport,
}

impl FittedPipeline {
    /// Encodes, splits, scales and fits the classifier on `table`.
    ///
    /// # Errors
    ///
    /// Fails on an empty table, when every label belongs to one class, or when
    /// the solver does not converge.
    #[tracing::instrument(skip_all, fields(rows = table.rows().len(), seed = config.seed))]
    pub fn fit(table: &OccurrenceTable, config: &PipelineConfig) -> Result<Self> {
        let rows = table.rows();
        let encoder = OneHotEncoder::fit(rows)?;
        let x = encoder.transform(rows)?;
        let y: Array1<bool> = rows.iter().map(|r| r.occurred == 1).collect();

        let split = train_test_split(rows.len(), config.test_fraction, config.seed);
        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.test);
        let y_test = y.select(Axis(0), &split.test);

        if y_train.iter().all(|&v| v) || y_train.iter().all(|&v| !v) {
            bail!("training labels contain a single class; cannot fit a classifier");
        }

        let scaler = StandardScaler::fit(&x_train)?;
        let x_train = scaler.transform(&x_train);
        let x_test = scaler.transform(&x_test);

        let eps = rbf_width(&x_train);
        let classifier = Svm::<f64, Pr>::params()
            .pos_neg_weights(1.0, 1.0)
            .gaussian_kernel(eps)
            .fit(&Dataset::new(x_train, y_train))
            .map_err(|e| anyhow!("failed to fit RBF classifier: {e}"))?;

        let test_accuracy = if x_test.nrows() == 0 {
            warn!("Test split is empty, accuracy not measured");
            0.0
        } else {
            let probs: Array1<Pr> = classifier.predict(&x_test);
            let hits: Vec<f64> = probs
                .iter()
                .zip(&y_test)
                .map(|(p, &label)| f64::from((probability(p) >= 0.5) == label))
                .collect();
            mean(&hits)
        };

        let report = FitReport {
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            n_features: encoder.n_features(),
            test_accuracy,
        };
        info!(
            train_rows = report.train_rows,
            test_rows = report.test_rows,
            n_features = report.n_features,
            test_accuracy = report.test_accuracy,
            kernel_eps = eps,
            "Classifier fitted"
        );

        Ok(Self {
            common_incidents: table.common_incidents().to_vec(),
            encoder,
            scaler,
            classifier,
            report,
        })
    }

    pub fn common_incidents(&self) -> &[String] {
        &self.common_incidents
    }

    pub fn report(&self) -> FitReport {
        self.report
    }

    /// Positive-class probability in `[0, 1]` for a single `(state, year, incident)`.
    pub fn probability(&self, state: &str, year: i32, incident: &str) -> Result<f64> {
        let encoded = self.encoder.encode(state, year, incident)?;
        let scaled = self.scaler.transform_one(&encoded).insert_axis(Axis(0));
        let probs: Array1<Pr> = self.classifier.predict(&scaled);
        probs
            .get(0)
            .map(probability)
            .ok_or_else(|| anyhow!("classifier returned no probability"))
    }

    /// Probabilities for every row of a table, in row order.
    pub fn probabilities(&self, rows: &[OccurrenceRow]) -> Result<Vec<f64>> {
        let x = self.scaler.transform(&self.encoder.transform(rows)?);
        let probs: Array1<Pr> = self.classifier.predict(&x);
        Ok(probs.iter().map(probability).collect())
    }
}

fn probability(p: &Pr) -> f64 {
    f64::from(**p)
}

/// Gaussian kernel width `1 / gamma` with `gamma = 1 / (n_features * Var(X))`.
fn rbf_width(x: &Array2<f64>) -> f64 {
    let values: Vec<f64> = x.iter().copied().collect();
    let var = variance(&values, mean(&values));
    if var > 0.0 {
        x.ncols() as f64 * var
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DeclarationRecord;
    use ndarray::array;

    /// Coastal states flood every year, inland states burn; a few odd years break the pattern.
    fn synthetic_table() -> OccurrenceTable {
        let mut records = Vec::new();
        for year in 2000..2012 {
            for state in ["FL", "LA", "TX"] {
                records.push(DeclarationRecord::new(state, year, "Flood"));
                if year % 4 == 0 {
                    records.push(DeclarationRecord::new(state, year, "Fire"));
                }
            }
            for state in ["AZ", "NV", "UT"] {
                records.push(DeclarationRecord::new(state, year, "Fire"));
                if year % 5 == 0 {
                    records.push(DeclarationRecord::new(state, year, "Flood"));
                }
            }
        }
        OccurrenceTable::build(&records, 5)
    }

    #[test]
    fn test_rbf_width_scale_convention() {
        let x = array![[1.0, -1.0], [-1.0, 1.0]];
        // var of all elements is 1, two features
        assert_eq!(rbf_width(&x), 2.0);
        assert_eq!(rbf_width(&array![[0.0, 0.0]]), 1.0);
    }

    #[test]
    fn test_fit_reports_split() {
        let table = synthetic_table();
        let fitted = FittedPipeline::fit(&table, &PipelineConfig::default()).unwrap();
        let report = fitted.report();

        assert_eq!(report.train_rows + report.test_rows, table.rows().len());
        assert_eq!(report.test_rows, (table.rows().len() as f64 * 0.25).ceil() as usize);
        // 6 states + 2 incidents + year
        assert_eq!(report.n_features, 9);
        assert!((0.0..=1.0).contains(&report.test_accuracy));
        assert_eq!(fitted.common_incidents(), table.common_incidents());
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let fitted = FittedPipeline::fit(&synthetic_table(), &PipelineConfig::default()).unwrap();
        for state in ["FL", "AZ"] {
            for incident in ["Flood", "Fire"] {
                let p = fitted.probability(state, 2030, incident).unwrap();
                assert!((0.0..=1.0).contains(&p), "{state}/{incident}: {p}");
            }
        }
    }

    #[test]
    fn test_probability_unknown_state_errors() {
        let fitted = FittedPipeline::fit(&synthetic_table(), &PipelineConfig::default()).unwrap();
        assert!(fitted.probability("WY", 2030, "Flood").is_err());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let table = synthetic_table();
        let a = FittedPipeline::fit(&table, &PipelineConfig::default()).unwrap();
        let b = FittedPipeline::fit(&table, &PipelineConfig::default()).unwrap();

        assert_eq!(a.probabilities(table.rows()).unwrap(), b.probabilities(table.rows()).unwrap());
    }

    #[test]
    fn test_fit_single_class_fails() {
        let records = vec![
            DeclarationRecord::new("FL", 2000, "Flood"),
            DeclarationRecord::new("FL", 2001, "Flood"),
            DeclarationRecord::new("FL", 2002, "Flood"),
        ];
        let table = OccurrenceTable::build(&records, 5);
        assert!(FittedPipeline::fit(&table, &PipelineConfig::default()).is_err());
    }
}
