use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::stateless_llm_interface::{wire_role, StatelessLLMInterface};
use crate::report::Message;

/// Ollama LLM implementation for locally hosted models
pub struct OllamaLLM {
    model: String,
    base_url: String,
    temperature: f32,
    keep_alive: f32,
    client: Client,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    keep_alive: f32,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: WireMessage,
}

impl OllamaLLM {
    pub fn new(model: String, base_url: String, temperature: f32, keep_alive: f32) -> Self {
        info!("Initialized OllamaLLM: model={}, base_url={}", model, base_url);
        Self {
            model,
            base_url,
            temperature,
            keep_alive,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl StatelessLLMInterface for OllamaLLM {
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

        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: wire_messages,
            stream: false,
            keep_alive: self.keep_alive,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM request failed with {}: {}", status, body);
        }

        let parsed: OllamaChatResponse = response.json().await?;
        Ok(parsed.message.content)
    }
}
