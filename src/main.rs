use std::path::PathBuf;
use std::process::ExitCode;

use tutor_engine::config::Config;
use tutor_engine::logging;
use tutor_engine::pipeline::{self, Dataset, PipelineOptions};
use tutor_engine::services::feedback::generator_from_settings;
use tutor_engine::services::llm_provider::LLMProvider;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = logging::init_tracing(&config.logging);

    let Some(dataset_path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TUTOR_DATASET").ok())
        .map(PathBuf::from)
    else {
        eprintln!("usage: tutor-pipeline <dataset.json>");
        return ExitCode::FAILURE;
    };

    if let Some(path) = &config.settings_path {
        tracing::info!(path = %path.display(), "settings loaded");
    }

    let dataset = match Dataset::load(&dataset_path) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!(error = %e, "failed to load dataset");
            return ExitCode::FAILURE;
        }
    };

    let feedback = generator_from_settings(LLMProvider::new(config.llm.clone()), &config.ai);
    let report = match pipeline::run(
        dataset,
        config.tutor.clone(),
        &PipelineOptions::default(),
        Some(&*feedback),
    ) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "pipeline failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize report");
            ExitCode::FAILURE
        }
    }
}
