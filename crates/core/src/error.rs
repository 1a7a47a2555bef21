use std::fmt;

pub const MIN_HISTORY_DAYS: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Fewer than [`MIN_HISTORY_DAYS`] historical samples were provided.
    InsufficientHistory { provided: usize },
    /// Missing field, unparseable date, bad quantity or out-of-range parameter.
    MalformedInput(String),
    /// The model artifact could not be loaded or failed validation.
    ModelUnavailable(String),
    /// The model adapter failed (or produced a non-finite value) during `predict`.
    PredictionFailure(String),
}

impl ForecastError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::MalformedInput(_) => "malformed_input",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::PredictionFailure(_) => "prediction_failure",
        }
    }

    /// Errors caused by the request itself rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientHistory { .. } | Self::MalformedInput(_)
        )
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientHistory { provided } => write!(
                f,
                "Need at least {MIN_HISTORY_DAYS} days of historical data (provided {provided})"
            ),
            Self::MalformedInput(detail) => write!(f, "malformed input: {detail}"),
            Self::ModelUnavailable(detail) => write!(f, "model unavailable: {detail}"),
            Self::PredictionFailure(detail) => write!(f, "prediction failed: {detail}"),
        }
    }
}

impl std::error::Error for ForecastError {}
