use crate::config::Settings;
use crate::domain::contract::{
    BatchItemResult, BatchRequest, BatchResponse, ErrorResponse, ForecastRequest,
    ForecastResponse, ModelUsed, DEFAULT_OUTLET_ID, DEFAULT_PRODUCT_ID,
};
use crate::engine::forecast;
use crate::error::ForecastError;
use crate::model::gbdt::GbdtModel;
use crate::model::{ModelAdapter, ModelSummary};
use std::sync::Arc;

/// Request-level entry point shared by the HTTP API and the CLI.
///
/// Holds the (optional) model for the process lifetime. Without a model every
/// forecast runs in fallback mode.
#[derive(Clone)]
pub struct ForecastService {
    model: Option<Arc<dyn ModelAdapter>>,
    max_forecast_days: u32,
    max_batch_size: usize,
}

impl ForecastService {
    pub fn new(model: Option<Arc<dyn ModelAdapter>>, settings: &Settings) -> Self {
        Self {
            model,
            max_forecast_days: settings.max_forecast_days,
            max_batch_size: settings.max_batch_size,
        }
    }

    /// Loads the configured model, degrading to fallback mode when it is unavailable.
    pub fn from_settings(settings: &Settings) -> Self {
        let model = match GbdtModel::load(&settings.model_path) {
            Ok(model) => {
                let summary = model.summary();
                tracing::info!(
                    path = %settings.model_path,
                    objective = %summary.objective,
                    num_trees = summary.num_trees,
                    "model loaded"
                );
                Some(Arc::new(model) as Arc<dyn ModelAdapter>)
            }
            Err(err) => {
                tracing::warn!(
                    path = %settings.model_path,
                    error = %err,
                    "running without model; forecasts will use EWM fallback"
                );
                None
            }
        };
        Self::new(model, settings)
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_used(&self) -> ModelUsed {
        if self.model_loaded() {
            ModelUsed::Model
        } else {
            ModelUsed::Fallback
        }
    }

    pub fn model_summary(&self) -> Option<ModelSummary> {
        self.model.as_ref().map(|m| m.summary())
    }

    pub fn predict(&self, req: ForecastRequest) -> Result<ForecastResponse, ForecastError> {
        let input = req.validate_and_into_input(self.max_forecast_days)?;
        let forecasts = forecast(
            input.outlet_id,
            input.product_id,
            &input.history,
            input.days,
            self.model.as_deref(),
        )?;

        Ok(ForecastResponse {
            success: true,
            forecasts,
            model_used: self.model_used(),
        })
    }

    /// Forecasts every product independently; one product failing does not affect the others.
    pub fn batch_predict(&self, req: BatchRequest) -> Result<BatchResponse, ForecastError> {
        if req.products.len() > self.max_batch_size {
            return Err(ForecastError::MalformedInput(format!(
                "batch may contain at most {} products (got {})",
                self.max_batch_size,
                req.products.len()
            )));
        }

        let results = req
            .products
            .into_iter()
            .map(|product| {
                let outlet_id = raw_id(&product, "outlet_id").unwrap_or(DEFAULT_OUTLET_ID);
                let product_id = raw_id(&product, "product_id").unwrap_or(DEFAULT_PRODUCT_ID);
                let outcome = serde_json::from_value::<ForecastRequest>(product)
                    .map_err(|e| ForecastError::MalformedInput(format!("invalid product: {e}")))
                    .and_then(|req| self.predict(req));
                match outcome {
                    Ok(resp) => BatchItemResult {
                        outlet_id,
                        product_id,
                        success: true,
                        forecasts: Some(resp.forecasts),
                        error: None,
                        provided: None,
                    },
                    Err(err) => {
                        let body = ErrorResponse::from(&err);
                        BatchItemResult {
                            outlet_id,
                            product_id,
                            success: false,
                            forecasts: None,
                            error: Some(body.error),
                            provided: body.provided,
                        }
                    }
                }
            })
            .collect();

        Ok(BatchResponse {
            success: true,
            model_used: self.model_used(),
            results,
        })
    }
}

fn raw_id(product: &serde_json::Value, key: &str) -> Option<i64> {
    product.get(key).and_then(serde_json::Value::as_i64)
}
