use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::agent::data_analyst_agent::DataAnalystAgent;
use crate::agent::interface::AgentInterface;
use crate::agent::stateless_llm_factory::StatelessLLMFactory;
use crate::sandbox_service::SandboxServiceClient;

/// Factory for creating agent instances
pub struct AgentFactory;

impl AgentFactory {
    /// Create an agent based on the configuration.
    ///
    /// # Arguments
    /// * `conversation_agent_choice` - The type of agent to create
    /// * `agent_settings` - Settings for different types of agents
    /// * `llm_configs` - Pool of LLM configurations keyed by provider name
    /// * `system_prompt` - The system prompt to use
    /// * `sandbox` - Sandbox service client for code execution
    pub fn create_agent(
        conversation_agent_choice: &str,
        agent_settings: &serde_json::Value,
        llm_configs: &serde_json::Value,
        system_prompt: &str,
        sandbox: Arc<SandboxServiceClient>,
    ) -> Result<Box<dyn AgentInterface>> {
        info!("Initializing agent: {}", conversation_agent_choice);

        match conversation_agent_choice {
            "data_analyst_agent" => {
                let settings = agent_settings
                    .get("data_analyst_agent")
                    .ok_or_else(|| anyhow::anyhow!("data_analyst_agent settings not found"))?;

                let llm_provider = settings
                    .get("llm_provider")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        anyhow::anyhow!("LLM provider not specified for data analyst agent")
                    })?;

                let llm_config = llm_configs.get(llm_provider).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Configuration not found for LLM provider: {}",
                        llm_provider
                    )
                })?;

                let llm =
                    StatelessLLMFactory::create_llm(llm_provider, Some(system_prompt), llm_config)?;

                let max_code_retries = settings
                    .get("max_code_retries")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1) as u32;
                let max_history_turns = settings
                    .get("max_history_turns")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(20) as usize;

                Ok(Box::new(DataAnalystAgent::new(
                    llm,
                    system_prompt.to_string(),
                    sandbox,
                    max_code_retries,
                    max_history_turns,
                )))
            }
            _ => Err(anyhow::anyhow!(
                "Unsupported agent type: {}",
                conversation_agent_choice
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sandbox() -> Arc<SandboxServiceClient> {
        Arc::new(SandboxServiceClient::new(
            "http://localhost:8000".to_string(),
            Duration::from_secs(5),
        ))
    }

    #[test]
    fn creates_data_analyst_agent() {
        let settings = serde_json::json!({
            "data_analyst_agent": { "llm_provider": "ollama_llm" }
        });
        let llm_configs = serde_json::json!({
            "ollama_llm": { "model": "llama3", "base_url": "http://localhost:11434" }
        });
        let agent =
            AgentFactory::create_agent("data_analyst_agent", &settings, &llm_configs, "sys", sandbox());
        assert!(agent.is_ok());
    }

    #[test]
    fn missing_provider_config_is_an_error() {
        let settings = serde_json::json!({
            "data_analyst_agent": { "llm_provider": "claude_llm" }
        });
        let llm_configs = serde_json::json!({});
        let agent =
            AgentFactory::create_agent("data_analyst_agent", &settings, &llm_configs, "sys", sandbox());
        assert!(agent.is_err());
    }

    #[test]
    fn unknown_agent_type_is_an_error() {
        let agent = AgentFactory::create_agent(
            "memory_agent",
            &serde_json::json!({}),
            &serde_json::json!({}),
            "sys",
            sandbox(),
        );
        assert!(agent.is_err());
    }
}
