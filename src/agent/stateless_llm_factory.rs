use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::agent::stateless_llm::claude_llm::ClaudeLLM;
use crate::agent::stateless_llm::ollama_llm::OllamaLLM;
use crate::agent::stateless_llm::openai_compatible_llm::OpenAICompatibleLLM;
use crate::agent::stateless_llm::StatelessLLMInterface;

/// Factory for creating stateless LLM instances
pub struct StatelessLLMFactory;

impl StatelessLLMFactory {
    /// Create an LLM based on the configuration.
    ///
    /// # Arguments
    /// * `llm_provider` - The type of LLM to create
    /// * `system_prompt` - Optional system prompt (used by providers that fix it at construction)
    /// * `config` - LLM configuration dictionary
    pub fn create_llm(
        llm_provider: &str,
        system_prompt: Option<&str>,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn StatelessLLMInterface>> {
        info!("Initializing LLM: {}", llm_provider);

        let api_key = config
            .get("llm_api_key")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| std::env::var("MIRA_LLM_API_KEY").ok())
            .unwrap_or_default();

        match llm_provider {
            "openai_compatible_llm" | "openai_llm" | "gemini_llm" | "deepseek_llm"
            | "groq_llm" | "mistral_llm" => Ok(Arc::new(OpenAICompatibleLLM::new(
                config.get("model").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                config
                    .get("base_url")
                    .and_then(|v| v.as_str())
                    .unwrap_or("https://api.openai.com/v1")
                    .to_string(),
                api_key,
                config.get("organization_id").and_then(|v| v.as_str()).map(|s| s.to_string()),
                config.get("project_id").and_then(|v| v.as_str()).map(|s| s.to_string()),
                config.get("temperature").and_then(|v| v.as_f64()).unwrap_or(1.0) as f32,
            ))),
            "claude_llm" => Ok(Arc::new(ClaudeLLM::new(
                system_prompt.unwrap_or("").to_string(),
                config
                    .get("base_url")
                    .and_then(|v| v.as_str())
                    .unwrap_or("https://api.anthropic.com")
                    .to_string(),
                config
                    .get("model")
                    .and_then(|v| v.as_str())
                    .unwrap_or("claude-3-5-sonnet-latest")
                    .to_string(),
                api_key,
            ))),
            "ollama_llm" => Ok(Arc::new(OllamaLLM::new(
                config.get("model").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                config
                    .get("base_url")
                    .and_then(|v| v.as_str())
                    .unwrap_or("http://localhost:11434")
                    .to_string(),
                config.get("temperature").and_then(|v| v.as_f64()).unwrap_or(1.0) as f32,
                config.get("keep_alive").and_then(|v| v.as_f64()).unwrap_or(-1.0) as f32,
            ))),
            _ => Err(anyhow::anyhow!("Unsupported LLM provider: {}", llm_provider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_construct() {
        let config = serde_json::json!({
            "model": "test-model",
            "base_url": "http://localhost:9999",
            "llm_api_key": "k",
        });
        for provider in [
            "openai_compatible_llm",
            "groq_llm",
            "deepseek_llm",
            "claude_llm",
            "ollama_llm",
        ] {
            assert!(
                StatelessLLMFactory::create_llm(provider, Some("sys"), &config).is_ok(),
                "provider {provider} should construct"
            );
        }
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let config = serde_json::json!({});
        assert!(StatelessLLMFactory::create_llm("bard_llm", None, &config).is_err());
    }
}
