pub mod api;
pub mod clinical_config;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::clinical_config::ClinicalConfig;
use crate::config::{AppConfig, ReasoningBackend, ReasoningConfig};
use crate::pipeline::classifier::ClassifierAdapter;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::reasoning::{
    GeminiClient, GeminiSettings, LlmClient, OllamaClient, ReasoningClient,
};
use crate::storage::{PatientStore, ReportStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Server error: {0}")]
    Server(#[from] api::ServerError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
}

pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = Arc::new(AppConfig::from_env()?);
    let clinical = Arc::new(ClinicalConfig::default());

    // Blocking HTTP clients are built outside the async runtime.
    let classifier = Arc::new(ClassifierAdapter::load(
        &app_config.model_path,
        &clinical.taxonomy,
    ));
    let reasoning = build_reasoning(&app_config.reasoning).map(Arc::new);
    let orchestrator = Arc::new(Orchestrator::new(clinical, classifier, reasoning));

    let ctx = ApiContext::new(
        orchestrator.clone(),
        ReportStore::new(&app_config.reports_dir)?,
        PatientStore::new(&app_config.patient_dir)?,
        app_config.clone(),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;
    runtime.block_on(api::serve_until_ctrl_c(ctx, &app_config.bind_addr()))?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}

/// Reasoning is optional: any problem here is logged and the service runs
/// classifier-only.
fn build_reasoning(cfg: &ReasoningConfig) -> Option<ReasoningClient> {
    let timeout = Duration::from_secs(cfg.timeout_secs);

    let (llm, preferences): (Arc<dyn LlmClient>, Vec<String>) = match cfg.backend {
        ReasoningBackend::None => {
            tracing::info!("Reasoning disabled, running classifier-only");
            return None;
        }
        ReasoningBackend::Gemini => {
            let settings = GeminiSettings {
                temperature: cfg.gemini.temperature,
                max_output_tokens: cfg.gemini.max_output_tokens,
            };
            let api_key = cfg.gemini.api_key.as_deref().unwrap_or_default();
            match GeminiClient::new(&cfg.gemini.base_url, api_key, settings, cfg.timeout_secs) {
                Ok(client) => (Arc::new(client), cfg.gemini.models.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "Gemini unavailable, running classifier-only");
                    return None;
                }
            }
        }
        ReasoningBackend::Ollama => match OllamaClient::new(&cfg.ollama_url, cfg.timeout_secs) {
            Ok(client) => (Arc::new(client), cfg.ollama_model.iter().cloned().collect()),
            Err(e) => {
                tracing::warn!(error = %e, "Ollama unavailable, running classifier-only");
                return None;
            }
        },
    };

    ReasoningClient::with_preferred_model(llm, &preferences, timeout)
}
