use crate::engine::smoothing::ewm;
use chrono::{Datelike, NaiveDate};

pub const FEATURE_COUNT: usize = 13;

/// Column order the model was trained with. Reordering silently corrupts predictions.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "outlet_id",
    "product_id",
    "lag_1",
    "lag_3",
    "lag_7",
    "rolling_mean_3",
    "rolling_mean_7",
    "rolling_std_3",
    "ewm_7",
    "day_of_week",
    "is_weekend",
    "day_of_month",
    "month",
];

pub const EWM_SPAN: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

pub fn build_features(
    outlet_id: i64,
    product_id: i64,
    window: &[f64],
    target_date: NaiveDate,
) -> FeatureVector {
    let last_3 = tail(window, 3);
    let last_7 = tail(window, 7);

    let day_of_week = target_date.weekday().num_days_from_monday();
    let is_weekend = if day_of_week >= 5 { 1.0 } else { 0.0 };

    FeatureVector([
        outlet_id as f64,
        product_id as f64,
        lag(window, 1),
        lag(window, 3),
        lag(window, 7),
        mean(last_3),
        mean(last_7),
        population_std(last_3),
        ewm(window, EWM_SPAN),
        f64::from(day_of_week),
        is_weekend,
        f64::from(target_date.day()),
        f64::from(target_date.month()),
    ])
}

// Missing lags are 0, not an error.
fn lag(window: &[f64], k: usize) -> f64 {
    window
        .len()
        .checked_sub(k)
        .map(|idx| window[idx])
        .unwrap_or(0.0)
}

fn tail(window: &[f64], n: usize) -> &[f64] {
    &window[window.len().saturating_sub(n)..]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
