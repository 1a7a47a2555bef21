use crate::domain::sales::{ForecastPoint, HistoricalSample};
use crate::error::{ForecastError, MIN_HISTORY_DAYS};
use crate::time::iso_date::parse_calendar_date;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OUTLET_ID: i64 = 1;
pub const DEFAULT_PRODUCT_ID: i64 = 1;
pub const DEFAULT_FORECAST_DAYS: i64 = 3;

/// `POST /predict` body as sent by clients. Everything is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub outlet_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub historical_sales: Option<Vec<RawSample>>,
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    pub date: String,
    pub quantity: RawQuantity,
}

/// Quantities arrive as JSON numbers, but numeric strings are tolerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Number(f64),
    Text(String),
}

/// A request that passed boundary validation and can go straight to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastInput {
    pub outlet_id: i64,
    pub product_id: i64,
    pub history: Vec<HistoricalSample>,
    pub days: u32,
}

impl ForecastRequest {
    pub fn outlet_id_or_default(&self) -> i64 {
        self.outlet_id.unwrap_or(DEFAULT_OUTLET_ID)
    }

    pub fn product_id_or_default(&self) -> i64 {
        self.product_id.unwrap_or(DEFAULT_PRODUCT_ID)
    }

    pub fn validate_and_into_input(self, max_days: u32) -> Result<ForecastInput, ForecastError> {
        let outlet_id = self.outlet_id_or_default();
        let product_id = self.product_id_or_default();

        let samples = self.historical_sales.unwrap_or_default();
        if samples.len() < MIN_HISTORY_DAYS {
            return Err(ForecastError::InsufficientHistory {
                provided: samples.len(),
            });
        }

        let days = self.days.unwrap_or(DEFAULT_FORECAST_DAYS);
        if days < 1 || days > i64::from(max_days) {
            return Err(ForecastError::MalformedInput(format!(
                "days must be between 1 and {max_days} (got {days})"
            )));
        }

        let history = samples
            .into_iter()
            .enumerate()
            .map(|(idx, s)| s.validate_and_into_sample(idx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ForecastInput {
            outlet_id,
            product_id,
            history,
            days: days as u32,
        })
    }
}

impl RawSample {
    fn validate_and_into_sample(self, idx: usize) -> Result<HistoricalSample, ForecastError> {
        let date = parse_calendar_date(&self.date).ok_or_else(|| {
            ForecastError::MalformedInput(format!(
                "historical_sales[{idx}].date is not an ISO-8601 date: {:?}",
                self.date
            ))
        })?;

        let quantity = match self.quantity {
            RawQuantity::Number(n) => Some(n),
            RawQuantity::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|q| q.is_finite())
        .ok_or_else(|| {
            ForecastError::MalformedInput(format!(
                "historical_sales[{idx}].quantity is not numeric"
            ))
        })?;

        if quantity < 0.0 {
            return Err(ForecastError::MalformedInput(format!(
                "historical_sales[{idx}].quantity must be non-negative (got {quantity})"
            )));
        }

        Ok(HistoricalSample { date, quantity })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelUsed {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub success: bool,
    pub forecasts: Vec<ForecastPoint>,
    pub model_used: ModelUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided: Option<usize>,
}

impl From<&ForecastError> for ErrorResponse {
    fn from(err: &ForecastError) -> Self {
        let provided = match err {
            ForecastError::InsufficientHistory { provided } => Some(*provided),
            _ => None,
        };
        Self {
            success: false,
            error: err.to_string(),
            provided,
        }
    }
}

/// Products stay untyped until forecast so one malformed entry only fails itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub products: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub outlet_id: i64,
    pub product_id: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecasts: Option<Vec<ForecastPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub model_used: ModelUsed,
    pub results: Vec<BatchItemResult>,
}

/// Decodes a request body; any JSON or shape error becomes `MalformedInput`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ForecastError> {
    serde_json::from_slice::<T>(body)
        .map_err(|e| ForecastError::MalformedInput(format!("invalid request body: {e}")))
}
