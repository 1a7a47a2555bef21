pub mod gbdt;

use crate::engine::features::FeatureVector;
use crate::error::ForecastError;
use serde::Serialize;

/// Scalar regressor over the 13-column feature vector.
///
/// Implementations are immutable once loaded and shared across request handlers.
pub trait ModelAdapter: Send + Sync {
    fn summary(&self) -> ModelSummary;

    fn predict(&self, features: &FeatureVector) -> Result<f64, ForecastError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub objective: String,
    pub num_trees: usize,
    pub num_features: usize,
    pub feature_names: Vec<String>,
}
