use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use umkm_core::config::Settings;
use umkm_core::domain::contract::{parse_body, BatchRequest, ErrorResponse, ForecastRequest};
use umkm_core::error::ForecastError;
use umkm_core::model::gbdt::GbdtModel;
use umkm_core::model::ModelAdapter;
use umkm_core::service::ForecastService;

#[derive(Debug, Parser)]
#[command(name = "umkm_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Forecast from a JSON request file and print the response JSON.
    Forecast {
        /// Request file, or `-` for stdin.
        #[arg(long)]
        input: String,

        /// Model dump to load instead of MODEL_PATH.
        #[arg(long)]
        model: Option<String>,

        /// Skip model loading and use the EWM fallback.
        #[arg(long)]
        fallback: bool,

        /// Treat the input as a batch request (`{"products": [...]}`).
        #[arg(long)]
        batch: bool,
    },

    /// Print objective, tree count and feature names of a model dump.
    InspectModel {
        #[arg(long)]
        model: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = umkm_core::telemetry::init_sentry(&settings, sentry::release_name!());

    // stdout carries the JSON result; logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Forecast {
            input,
            model,
            fallback,
            batch,
        } => {
            if let Some(path) = model {
                settings.model_path = path;
            }
            let service = if fallback {
                ForecastService::new(None, &settings)
            } else {
                ForecastService::from_settings(&settings)
            };

            let body = read_input(&input)?;
            match run_forecast(&service, &body, batch) {
                Ok(out) => println!("{}", serde_json::to_string_pretty(&out)?),
                Err(err) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&ErrorResponse::from(&err))?
                    );
                    let err = anyhow::Error::new(err);
                    sentry_anyhow::capture_anyhow(&err);
                    return Err(err.context("forecast failed"));
                }
            }
        }
        Command::InspectModel { model } => {
            let path = model.unwrap_or(settings.model_path);
            let model = GbdtModel::load(&path)
                .with_context(|| format!("failed to load model from {path}"))?;
            println!("{}", serde_json::to_string_pretty(&model.summary())?);
        }
    }

    Ok(())
}

fn read_input(input: &str) -> anyhow::Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read request from stdin")?;
        return Ok(buf);
    }
    std::fs::read(input).with_context(|| format!("failed to read request file {input}"))
}

fn run_forecast(
    service: &ForecastService,
    body: &[u8],
    batch: bool,
) -> Result<serde_json::Value, ForecastError> {
    let out = if batch {
        let req = parse_body::<BatchRequest>(body)?;
        serde_json::to_value(service.batch_predict(req)?)
    } else {
        let req = parse_body::<ForecastRequest>(body)?;
        serde_json::to_value(service.predict(req)?)
    };
    out.map_err(|e| ForecastError::PredictionFailure(format!("failed to encode response: {e}")))
}
