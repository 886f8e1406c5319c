use async_trait::async_trait;
use tracing::warn;

use crate::report::{AgentInput, AgentOutput, Message};

/// Base interface for all agent implementations
#[async_trait]
pub trait AgentInterface: Send + Sync {
    /// Run one analysis turn over the uploaded dataset.
    ///
    /// # Arguments
    /// * `input` - CSV bytes, the user's question and prior conversation turns
    ///
    /// # Returns
    /// The agent's summary, rendered charts and optional structured report
    async fn analyze(&mut self, input: AgentInput) -> Result<AgentOutput, anyhow::Error>;

    /// Load the agent's working memory from a stored conversation
    fn set_memory_from_history(&mut self, _messages: Vec<Message>) {
        warn!("Agent: no memory loader set. Prior turns will be ignored.");
    }
}
