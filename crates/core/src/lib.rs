pub mod domain;
pub mod engine;
pub mod error;
pub mod model;
pub mod service;
pub mod telemetry;
pub mod time;

pub mod config {
    use anyhow::Context;

    const DEFAULT_MODEL_PATH: &str = "models/umkm_forecast_model.json";
    const DEFAULT_PORT: u16 = 5000;
    const DEFAULT_MAX_FORECAST_DAYS: u32 = 365;
    const DEFAULT_MAX_BATCH_SIZE: usize = 100;
    const MAX_FORECAST_DAYS_LIMIT: u32 = 3650;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub model_path: String,
        pub port: u16,
        pub sentry_dsn: Option<String>,
        pub max_forecast_days: u32,
        pub max_batch_size: usize,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                model_path: DEFAULT_MODEL_PATH.to_string(),
                port: DEFAULT_PORT,
                sentry_dsn: None,
                max_forecast_days: DEFAULT_MAX_FORECAST_DAYS,
                max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            let settings = Self {
                model_path: std::env::var("MODEL_PATH")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(defaults.model_path),
                port: parse_env("PORT")?.unwrap_or(defaults.port),
                sentry_dsn: std::env::var("SENTRY_DSN")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                max_forecast_days: parse_env("FORECAST_MAX_DAYS")?
                    .unwrap_or(defaults.max_forecast_days),
                max_batch_size: parse_env("FORECAST_MAX_BATCH")?
                    .unwrap_or(defaults.max_batch_size),
            };
            settings.validate()?;
            Ok(settings)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                (1..=MAX_FORECAST_DAYS_LIMIT).contains(&self.max_forecast_days),
                "FORECAST_MAX_DAYS must be 1..={MAX_FORECAST_DAYS_LIMIT} (got {})",
                self.max_forecast_days
            );
            anyhow::ensure!(
                self.max_batch_size >= 1,
                "FORECAST_MAX_BATCH must be >= 1"
            );
            Ok(())
        }
    }

    fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let Ok(raw) = std::env::var(key) else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} must be a valid number (got {raw:?})"))
    }

}
