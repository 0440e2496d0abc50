//! Reasoning model configuration from TOML (`[model]` section)

use crate::providers::chat_completions::{
    ChatCompletionsConfig, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// # Example
///
/// ```toml
/// [model]
/// base_url = "https://api.groq.com/openai/v1"
/// model = "meta-llama/llama-4-scout-17b-16e-instruct"
/// api_key_env = "GROQ_API_KEY"
/// temperature = 0.2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: None,
            request_timeout_secs: 60,
        }
    }
}

impl FileModelConfig {
    pub fn to_gateway_config(&self, system_prompt: Option<String>) -> ChatCompletionsConfig {
        ChatCompletionsConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key_env: self.api_key_env.clone(),
            temperature: self.temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            system_prompt,
        }
    }
}
