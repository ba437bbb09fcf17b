use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::EngineError;

const DEFAULT_OPENING_MESSAGE: &str =
    "Hello! How can I help you with your benefits and employment questions today?";

/// Runtime configuration, resolved from the process environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub index_path: PathBuf,
    pub top_k: usize,
    pub history_window: usize,
    pub request_timeout: Duration,
    pub opening_message: String,
    pub port: u16,
}

impl AgentConfig {
    /// Resolve configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            EngineError::Configuration("OPENAI_API_KEY is not set in the environment".to_string())
        })?;

        let api_base = env::var("OPENAI_API_BASE").ok();

        let model = env::var("AGENT_MODEL").unwrap_or_else(|_| "gpt-4".to_string());

        let temperature = env::var("AGENT_TEMPERATURE")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.7);

        let embedding_model = env::var("AGENT_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());

        let embedding_dimension = env::var("AGENT_EMBEDDING_DIMENSION")
            .ok()
            .and_then(|d| d.parse().ok())
            .unwrap_or(1536);

        let index_path = env::var("AGENT_INDEX_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("vector_store/index.json"));

        let top_k = env::var("AGENT_TOP_K")
            .ok()
            .and_then(|k| k.parse().ok())
            .unwrap_or(3);

        let history_window = env::var("AGENT_HISTORY_WINDOW")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(20);

        let request_timeout = env::var("AGENT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let opening_message = env::var("AGENT_OPENING_MESSAGE")
            .unwrap_or_else(|_| DEFAULT_OPENING_MESSAGE.to_string());

        let port = env::var("AGENT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        if !(0.0..=2.0).contains(&temperature) {
            return Err(EngineError::Configuration(format!(
                "AGENT_TEMPERATURE must be within [0, 2], got {}",
                temperature
            )));
        }

        Ok(Self {
            api_key,
            api_base,
            model,
            temperature,
            embedding_model,
            embedding_dimension,
            index_path,
            top_k,
            history_window,
            request_timeout,
            opening_message,
            port,
        })
    }
}
