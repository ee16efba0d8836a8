use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::enums::{str_enum, ParseEnumError};
use crate::pipeline::reasoning::gemini::DEFAULT_GEMINI_URL;
use crate::pipeline::reasoning::ollama::DEFAULT_OLLAMA_URL;
use crate::pipeline::reasoning::DEFAULT_REASONING_TIMEOUT_SECS;
use crate::storage::history::DEFAULT_HISTORY_LIMIT;

/// Application-level constants
pub const APP_NAME: &str = "MediPatient";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_RETENTION_LIMIT: usize = 200;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "medipatient_lib=info,medipatient=info,tower_http=info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{0}")]
    InvalidBackend(#[from] ParseEnumError),
}

str_enum!(ReasoningBackend {
    Gemini => "gemini",
    Ollama => "ollama",
    None => "none",
});

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    /// Preference order; the first one the service lists is used.
    pub models: Vec<String>,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningConfig {
    pub backend: ReasoningBackend,
    pub timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub ollama_url: String,
    /// Unset means "first model the local instance lists".
    pub ollama_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub reports_dir: PathBuf,
    pub patient_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub history_limit: usize,
    /// Files kept per store after each save.
    pub retention_limit: usize,
    pub reasoning: ReasoningConfig,
}

impl AppConfig {
    /// Load `.env` (if any), then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("GEMINI_API_KEY");
        let backend = match get("REASONING_BACKEND") {
            Some(raw) => raw.parse()?,
            None if api_key.is_some() => ReasoningBackend::Gemini,
            None => ReasoningBackend::None,
        };

        let models = get("GEMINI_MODEL")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_GEMINI_MODEL.to_string()]);

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            model_path: get("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models/disease_model.json")),
            reports_dir: get("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output/reports")),
            patient_dir: get("PATIENT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output/patient_data")),
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            history_limit: parse_or(&get, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            retention_limit: parse_or(&get, "RETENTION_LIMIT", DEFAULT_RETENTION_LIMIT)?,
            reasoning: ReasoningConfig {
                backend,
                timeout_secs: parse_or(
                    &get,
                    "REASONING_TIMEOUT_SECS",
                    DEFAULT_REASONING_TIMEOUT_SECS,
                )?,
                gemini: GeminiConfig {
                    api_key,
                    models,
                    base_url: get("GEMINI_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
                    temperature: parse_or(&get, "GEMINI_TEMPERATURE", 0.1)?,
                    max_output_tokens: parse_or(&get, "GEMINI_MAX_TOKENS", 2000)?,
                },
                ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                ollama_model: get("OLLAMA_MODEL"),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}
