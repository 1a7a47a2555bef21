pub mod features;
pub mod smoothing;

use crate::domain::sales::{ForecastPoint, HistoricalSample};
use crate::engine::features::{build_features, EWM_SPAN};
use crate::engine::smoothing::ewm;
use crate::error::{ForecastError, MIN_HISTORY_DAYS};
use crate::model::ModelAdapter;
use chrono::Duration;

/// Recursive multi-day forecast.
///
/// Each step builds features from the rolling window, predicts, and appends the raw
/// (unrounded) prediction to the window before the next step. Without a model the
/// prediction is the EWM of the window. Rounding only affects the returned points.
///
/// History length and `days` are validated by the caller. A model failure aborts the
/// whole run; no partial sequence is returned.
pub fn forecast(
    outlet_id: i64,
    product_id: i64,
    history: &[HistoricalSample],
    days: u32,
    model: Option<&dyn ModelAdapter>,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|s| s.date);

    let Some(last_date) = sorted.last().map(|s| s.date) else {
        return Err(ForecastError::InsufficientHistory { provided: 0 });
    };

    let seed_from = sorted.len().saturating_sub(MIN_HISTORY_DAYS);
    let mut window: Vec<f64> = sorted[seed_from..].iter().map(|s| s.quantity).collect();

    let mut out = Vec::new();
    for day in 1..=days {
        let target_date = last_date
            .checked_add_signed(Duration::days(i64::from(day)))
            .ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "forecast date overflows the calendar ({last_date} + {day} days)"
                ))
            })?;

        let features = build_features(outlet_id, product_id, &window, target_date);

        let raw = match model {
            Some(model) => model.predict(&features)?,
            None => ewm(&window, EWM_SPAN),
        };
        if !raw.is_finite() {
            return Err(ForecastError::PredictionFailure(format!(
                "non-finite prediction {raw} for {target_date}"
            )));
        }

        out.push(ForecastPoint {
            date: target_date,
            forecast: round_forecast(raw),
        });

        window.push(raw);
    }

    Ok(out)
}

// Half away from zero, clamped at 0.
fn round_forecast(raw: f64) -> u64 {
    raw.round().max(0.0) as u64
}
