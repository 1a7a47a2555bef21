use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use umkm_core::domain::contract::{
    parse_body, BatchRequest, ErrorResponse, ForecastRequest, ModelUsed,
};
use umkm_core::error::ForecastError;
use umkm_core::model::ModelSummary;
use umkm_core::service::ForecastService;

const SERVICE_NAME: &str = "UMKM Sales Forecasting API";

#[derive(Clone)]
pub struct AppState {
    pub service: ForecastService,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/predict", post(predict))
        .route("/batch-predict", post(batch_predict))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    status: &'static str,
    service: &'static str,
    model_loaded: bool,
    model_used: ModelUsed,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelSummary>,
}

async fn index(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "ok",
        service: SERVICE_NAME,
        model_loaded: state.service.model_loaded(),
        model_used: state.service.model_used(),
        version: env!("CARGO_PKG_VERSION"),
        model: state.service.model_summary(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let result = parse_body::<ForecastRequest>(&body).and_then(|req| state.service.predict(req));
    match result {
        Ok(resp) => {
            tracing::debug!(
                days = resp.forecasts.len(),
                model_used = ?resp.model_used,
                "forecast served"
            );
            Json(resp).into_response()
        }
        Err(err) => error_response(&err, "/predict"),
    }
}

async fn batch_predict(State(state): State<AppState>, body: Bytes) -> Response {
    let result =
        parse_body::<BatchRequest>(&body).and_then(|req| state.service.batch_predict(req));
    match result {
        Ok(resp) => {
            let failed = resp.results.iter().filter(|r| !r.success).count();
            tracing::debug!(
                products = resp.results.len(),
                failed,
                "batch forecast served"
            );
            Json(resp).into_response()
        }
        Err(err) => error_response(&err, "/batch-predict"),
    }
}

fn status_for(err: &ForecastError) -> StatusCode {
    match err {
        ForecastError::InsufficientHistory { .. } | ForecastError::MalformedInput(_) => {
            StatusCode::BAD_REQUEST
        }
        ForecastError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ForecastError::PredictionFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &ForecastError, route: &'static str) -> Response {
    if err.is_client_error() {
        tracing::info!(route, kind = err.kind(), error = %err, "rejected forecast request");
    } else {
        let report = anyhow::Error::new(err.clone());
        sentry_anyhow::capture_anyhow(&report);
        tracing::error!(route, kind = err.kind(), error = %err, "forecast request failed");
    }
    (status_for(err), Json(ErrorResponse::from(err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use umkm_core::config::Settings;
    use umkm_core::engine::features::FeatureVector;
    use umkm_core::model::ModelAdapter;

    struct Broken;

    impl ModelAdapter for Broken {
        fn summary(&self) -> ModelSummary {
            ModelSummary {
                objective: "regression".to_string(),
                num_trees: 3,
                num_features: 13,
                feature_names: Vec::new(),
            }
        }

        fn predict(&self, _features: &FeatureVector) -> Result<f64, ForecastError> {
            Err(ForecastError::PredictionFailure("corrupt tree".to_string()))
        }
    }

    fn fallback_state() -> AppState {
        AppState {
            service: ForecastService::new(None, &Settings::default()),
        }
    }

    fn sales(n: usize) -> Value {
        let quantities = [5, 3, 4, 6, 2, 5, 7];
        let rows: Vec<Value> = (1..=n)
            .map(|d| {
                let quantity = quantities[(d - 1) % quantities.len()];
                json!({"date": format!("2024-01-{d:02}T00:00:00Z"), "quantity": quantity})
            })
            .collect();
        Value::Array(rows)
    }

    async fn into_json(resp: Response) -> (StatusCode, Value) {
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn predict_fallback_returns_forecasts() {
        let body = json!({"outlet_id": 1, "product_id": 1, "historical_sales": sales(7), "days": 3});
        let resp = predict(State(fallback_state()), Bytes::from(body.to_string())).await;
        let (status, v) = into_json(resp).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            v,
            json!({
                "success": true,
                "forecasts": [
                    {"date": "2024-01-08", "forecast": 5},
                    {"date": "2024-01-09", "forecast": 5},
                    {"date": "2024-01-10", "forecast": 5},
                ],
                "model_used": "fallback",
            })
        );
    }

    #[tokio::test]
    async fn predict_rejects_six_samples_with_count() {
        let body = json!({"historical_sales": sales(6)});
        let resp = predict(State(fallback_state()), Bytes::from(body.to_string())).await;
        let (status, v) = into_json(resp).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["provided"], json!(6));
    }

    #[tokio::test]
    async fn predict_rejects_malformed_json() {
        let resp = predict(State(fallback_state()), Bytes::from_static(b"{oops")).await;
        let (status, v) = into_json(resp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["success"], json!(false));
        assert!(v.get("provided").is_none());
    }

    #[tokio::test]
    async fn model_failure_is_server_error() {
        let state = AppState {
            service: ForecastService::new(Some(Arc::new(Broken)), &Settings::default()),
        };
        let body = json!({"historical_sales": sales(7)});
        let resp = predict(State(state), Bytes::from(body.to_string())).await;
        let (status, v) = into_json(resp).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["success"], json!(false));
        assert!(v.get("forecasts").is_none());
    }

    #[tokio::test]
    async fn batch_predict_reports_per_product() {
        let mut bad_sales = sales(7);
        bad_sales[0]["quantity"] = json!(true);
        let body = json!({"products": [
            {"product_id": 1, "historical_sales": sales(7), "days": 2},
            {"product_id": 2, "historical_sales": sales(2)},
            {"product_id": 3, "historical_sales": bad_sales},
        ]});
        let resp = batch_predict(State(fallback_state()), Bytes::from(body.to_string())).await;
        let (status, v) = into_json(resp).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["model_used"], json!("fallback"));
        assert_eq!(v["results"][0]["success"], json!(true));
        assert_eq!(v["results"][0]["forecasts"].as_array().map(Vec::len), Some(2));
        assert_eq!(v["results"][1]["success"], json!(false));
        assert_eq!(v["results"][1]["provided"], json!(2));
        assert_eq!(v["results"][2]["success"], json!(false));
        assert_eq!(v["results"][2]["product_id"], json!(3));
        assert!(v["results"][2]["error"].is_string());
    }

    #[tokio::test]
    async fn index_reports_model_state() {
        let Json(status) = index(State(fallback_state())).await;
        let v = serde_json::to_value(&status).unwrap();
        assert_eq!(v["status"], json!("ok"));
        assert_eq!(v["model_loaded"], json!(false));
        assert_eq!(v["model_used"], json!("fallback"));
        assert!(v.get("model").is_none());

        let state = AppState {
            service: ForecastService::new(Some(Arc::new(Broken)), &Settings::default()),
        };
        let Json(status) = index(State(state)).await;
        let v = serde_json::to_value(&status).unwrap();
        assert_eq!(v["model_loaded"], json!(true));
        assert_eq!(v["model"]["num_trees"], json!(3));
    }

    #[test]
    fn error_kinds_map_to_status_codes() {
        assert_eq!(
            status_for(&ForecastError::InsufficientHistory { provided: 1 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ForecastError::MalformedInput("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ForecastError::ModelUnavailable("x".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&ForecastError::PredictionFailure("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
