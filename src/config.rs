use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub agent_config: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_chart_cache_dir")]
    pub chart_cache_dir: String,
    #[serde(default = "default_session_history_dir")]
    pub session_history_dir: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_description")]
    pub service_description: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_chart_cache_dir() -> String {
    "cache/charts".to_string()
}

fn default_session_history_dir() -> String {
    "session_history".to_string()
}

fn default_service_name() -> String {
    "Mira - WhatsApp Data Analyst".to_string()
}

fn default_service_description() -> String {
    "Mira turns messy CSVs into instant WhatsApp-ready insights with AI-driven reports"
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_choice")]
    pub conversation_agent_choice: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_agent_settings")]
    pub agent_settings: serde_json::Value,
    #[serde(default = "default_llm_configs")]
    pub llm_configs: serde_json::Value,
    #[serde(default = "default_sandbox_service_url")]
    pub sandbox_service_url: String,
    #[serde(default = "default_sandbox_timeout_secs")]
    pub sandbox_timeout_secs: u64,
}

fn default_agent_choice() -> String {
    "data_analyst_agent".to_string()
}

fn default_system_prompt() -> String {
    "You are Mira, a friendly data analyst. You answer questions about uploaded \
     CSV datasets with concise, decision-ready insights."
        .to_string()
}

fn default_agent_settings() -> serde_json::Value {
    serde_json::json!({
        "data_analyst_agent": {
            "llm_provider": "openai_compatible_llm",
            "max_code_retries": 1,
            "max_history_turns": 20
        }
    })
}

fn default_llm_configs() -> serde_json::Value {
    serde_json::json!({
        "openai_compatible_llm": {
            "model": "gpt-4o-mini",
            "base_url": "https://api.openai.com/v1",
            "temperature": 0.2
        }
    })
}

fn default_sandbox_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_sandbox_timeout_secs() -> u64 {
    120
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;

        // Determine file type by extension
        let path_lower = path.to_lowercase();
        if path_lower.ends_with(".json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            chart_cache_dir: default_chart_cache_dir(),
            session_history_dir: default_session_history_dir(),
            service_name: default_service_name(),
            service_description: default_service_description(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            conversation_agent_choice: default_agent_choice(),
            system_prompt: default_system_prompt(),
            agent_settings: default_agent_settings(),
            llm_configs: default_llm_configs(),
            sandbox_service_url: default_sandbox_service_url(),
            sandbox_timeout_secs: default_sandbox_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("system_config:\n  port: 9001\n").unwrap();
        assert_eq!(config.system_config.port, 9001);
        assert_eq!(config.system_config.host, "localhost");
        assert_eq!(
            config.agent_config.conversation_agent_choice,
            "data_analyst_agent"
        );
        assert!(config.agent_config.llm_configs.get("openai_compatible_llm").is_some());
    }

    #[test]
    fn agent_overrides_are_read() {
        let yaml = r#"
agent_config:
  conversation_agent_choice: data_analyst_agent
  agent_settings:
    data_analyst_agent:
      llm_provider: claude_llm
      max_code_retries: 2
  llm_configs:
    claude_llm:
      model: claude-3-5-sonnet-latest
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let provider = config.agent_config.agent_settings["data_analyst_agent"]["llm_provider"]
            .as_str()
            .unwrap();
        assert_eq!(provider, "claude_llm");
        assert_eq!(config.agent_config.sandbox_timeout_secs, 120);
    }
}
