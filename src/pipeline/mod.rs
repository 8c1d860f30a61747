//! Disaster-incidence pipeline.
//!
//! Raw declarations are deduplicated, reduced to the most common incident
//! types and pivoted into a per-(state, year) occurrence table, which is
//! cached to CSV. A one-hot encoder, standard scaler and RBF support-vector
//! classifier are then fit once on that table and answer per-state forecasts.

pub mod builder;
pub mod cache;
pub mod encode;
pub mod model;
pub mod occurrence;
pub mod predict;
pub mod split;
pub mod types;
pub mod utility;

pub use builder::{initialize, load_or_build_table, rebuild_table};
pub use model::FittedPipeline;
pub use predict::predict_by_year;
pub use types::{
    AVG_KEY, FitReport, IncidentPercentages, OccurrenceRow, OccurrenceTable, StatePrediction,
};
