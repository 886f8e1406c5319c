use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::stateless_llm_interface::{wire_role, StatelessLLMInterface};
use crate::report::Message;

/// OpenAI compatible LLM implementation
/// Also serves Groq, DeepSeek, Mistral and other chat-completions endpoints
pub struct OpenAICompatibleLLM {
    model: String,
    base_url: String,
    api_key: String,
    organization_id: Option<String>,
    project_id: Option<String>,
    temperature: f32,
    client: Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

impl OpenAICompatibleLLM {
    pub fn new(
        model: String,
        base_url: String,
        api_key: String,
        organization_id: Option<String>,
        project_id: Option<String>,
        temperature: f32,
    ) -> Self {
        info!(
            "Initialized OpenAICompatibleLLM: model={}, base_url={}",
            model, base_url
        );
        Self {
            model,
            base_url,
            api_key,
            organization_id,
            project_id,
            temperature,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl StatelessLLMInterface for OpenAICompatibleLLM {
    async fn chat_completion(
        &self,
        messages: Vec<Message>,
        system: Option<&str>,
    ) -> Result<String, anyhow::Error> {
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(sys) = system {
            wire_messages.push(WireMessage {
                role: "system".to_string(),
                content: sys.to_string(),
            });
        }
        for msg in messages {
            wire_messages.push(WireMessage {
                role: wire_role(msg.role).to_string(),
                content: msg.content,
            });
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: wire_messages,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(org) = &self.organization_id {
            builder = builder.header("OpenAI-Organization", org);
        }
        if let Some(project) = &self.project_id {
            builder = builder.header("OpenAI-Project", project);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM request failed with {}: {}", status, body);
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("LLM response contained no choices"))
    }
}
