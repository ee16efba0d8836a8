pub mod client;
pub mod gemini;
#[cfg(test)]
pub mod mock;
pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod types;

pub use client::{ReasoningClient, DEFAULT_REASONING_TIMEOUT_SECS};
pub use gemini::{GeminiClient, GeminiSettings};
pub use ollama::OllamaClient;
pub use types::{
    LlmClient, ReasoningError, ReasoningOutcome, ReasoningOutput, UnavailableReason,
};
