use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::stateless_llm_interface::{wire_role, StatelessLLMInterface};
use crate::report::Message;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Claude LLM implementation. The system prompt is fixed at construction.
pub struct ClaudeLLM {
    model: String,
    base_url: String,
    api_key: String,
    system: String,
    client: Client,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

impl ClaudeLLM {
    pub fn new(system: String, base_url: String, model: String, api_key: String) -> Self {
        info!("Initialized ClaudeLLM: model={}, base_url={}", model, base_url);
        Self {
            model,
            base_url,
            api_key,
            system,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl StatelessLLMInterface for ClaudeLLM {
    async fn chat_completion(
        &self,
        messages: Vec<Message>,
        _system: Option<&str>,
    ) -> Result<String, anyhow::Error> {
        // Claude uses the system prompt from the constructor
        let wire_messages = messages
            .into_iter()
            .map(|msg| WireMessage {
                role: wire_role(msg.role).to_string(),
                content: msg.content,
            })
            .collect();

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: self.system.clone(),
            messages: wire_messages,
        };

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM request failed with {}: {}", status, body);
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text)
            .collect();
        if text.is_empty() {
            anyhow::bail!("LLM response contained no text blocks");
        }
        Ok(text)
    }
}
