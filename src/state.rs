use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::agent::{AgentFactory, AgentInterface};
use crate::config::Config;
use crate::sandbox_service::SandboxServiceClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client_contexts: Arc<DashMap<String, ClientContext>>,
    pub sandbox_service: Arc<SandboxServiceClient>,
    pub analysis_tasks: Arc<DashMap<String, tokio::task::AbortHandle>>,
}

#[derive(Clone)]
pub struct ClientContext {
    pub client_uid: String,
    pub session_uid: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let base_url = std::env::var("SANDBOX_SERVICE_URL")
            .unwrap_or_else(|_| config.agent_config.sandbox_service_url.clone());
        let sandbox_service = Arc::new(SandboxServiceClient::new(
            base_url,
            Duration::from_secs(config.agent_config.sandbox_timeout_secs),
        ));

        Ok(Self {
            config,
            client_contexts: Arc::new(DashMap::new()),
            sandbox_service,
            analysis_tasks: Arc::new(DashMap::new()),
        })
    }

    pub fn generate_client_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    pub fn session_history_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.system_config.session_history_dir)
    }

    pub fn chart_cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.system_config.chart_cache_dir)
    }

    /// Agents are per-turn; memory rides in the session files
    pub fn create_agent(&self) -> anyhow::Result<Box<dyn AgentInterface>> {
        AgentFactory::create_agent(
            &self.config.agent_config.conversation_agent_choice,
            &self.config.agent_config.agent_settings,
            &self.config.agent_config.llm_configs,
            &self.config.agent_config.system_prompt,
            self.sandbox_service.clone(),
        )
    }
}
