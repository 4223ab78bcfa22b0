//! Process configuration. Defaults, then an optional JSON settings file,
//! then environment variables; later sources win.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogOptions;
use crate::services::llm_provider::LLMConfig;
use crate::tutor::config::TutorConfig;
use crate::tutor::error::TutorError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] TutorError),
}

/// Switches for the optional feedback layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub feedback_enabled: bool,
    pub hint_generation_enabled: bool,
    pub personalized_feedback: bool,
    pub log_ai_calls: bool,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            feedback_enabled: true,
            hint_generation_enabled: true,
            personalized_feedback: true,
            log_ai_calls: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub log_ai_calls: bool,
    /// Write a daily log file; `ENABLE_FILE_LOGS` overrides.
    pub file_logs: bool,
    /// Defaults to `./logs`; `LOG_DIR` overrides.
    pub file_dir: Option<PathBuf>,
}

/// On-disk settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub ai_settings: AiSettings,
    pub logging: LoggingSettings,
    pub tutor: TutorConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LogOptions,
    pub settings_path: Option<PathBuf>,
    pub tutor: TutorConfig,
    pub llm: LLMConfig,
    pub ai: AiSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings_path = std::env::var("TUTOR_SETTINGS").ok().map(PathBuf::from);
        let settings = match &settings_path {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        Self::from_settings(settings, settings_path)
    }

    pub fn from_settings(settings: Settings, settings_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let logging = log_options(&settings.logging);

        let mut llm = LLMConfig::default();
        if let Some(key) = settings.llm.api_key {
            llm.api_key = Some(key);
        }
        if let Some(model) = settings.llm.model {
            llm.model = model;
        }
        if let Some(endpoint) = settings.llm.api_endpoint {
            llm.api_endpoint = endpoint;
        }
        if let Some(secs) = settings.llm.timeout_secs {
            llm.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = settings.llm.max_retries {
            llm.max_retries = retries;
        }
        let llm = llm.with_env_overrides();

        let mut ai = settings.ai_settings;
        ai.log_ai_calls |= settings.logging.log_ai_calls;
        if let Some(enabled) = env_bool("TUTOR_FEEDBACK_ENABLED") {
            ai.feedback_enabled = enabled;
        }
        if let Some(enabled) = env_bool("TUTOR_HINTS_ENABLED") {
            ai.hint_generation_enabled = enabled;
        }

        let tutor = settings.tutor.with_env_overrides();
        tutor.validate()?;

        Ok(Self {
            logging,
            settings_path,
            tutor,
            llm,
            ai,
        })
    }
}

fn log_options(settings: &LoggingSettings) -> LogOptions {
    let level = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| settings.level.clone())
        .unwrap_or_else(|| LogOptions::default().level);

    let file_dir = env_bool("ENABLE_FILE_LOGS")
        .unwrap_or(settings.file_logs)
        .then(|| {
            std::env::var("LOG_DIR")
                .ok()
                .map(PathBuf::from)
                .or_else(|| settings.file_dir.clone())
                .unwrap_or_else(|| PathBuf::from("./logs"))
        });

    LogOptions { level, file_dir }
}

fn env_bool(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
