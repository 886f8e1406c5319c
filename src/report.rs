use serde::{Deserialize, Serialize};

/// Role of a conversation participant.
/// Only these two literals are accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation log. Sequences of these are chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One request to the analysis agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    /// Raw CSV bytes as uploaded. Base64 string on the wire.
    #[serde(with = "base64_bytes")]
    pub csv_buffer: Vec<u8>,
    /// The user's current question about the dataset
    pub user_message: String,
    /// Prior conversation turns, oldest first
    #[serde(default)]
    pub conversation_history: Vec<Message>,
}

/// The agent's answer for one analysis turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    /// Prose summary of the analysis
    pub summary: String,
    /// Rendered chart image buffers, in creation order. Base64 strings on the wire.
    #[serde(with = "base64_buffers")]
    pub charts: Vec<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_report: Option<ReportData>,
    /// Raw insights from the agent. Intentionally unconstrained.
    #[serde(default)]
    pub insights: serde_json::Value,
}

/// Caption and analysis bullets for one chart, independent of its rendered image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportChart {
    pub title: String,
    pub bullets: Vec<String>,
}

/// Structured report for one analysis session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub summary: String,
    pub kpis: Vec<String>,
    pub charts: Vec<ReportChart>,
    // Aliases accept the snake_case spelling models tend to produce
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "external_context")]
    pub external_context: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "next_steps")]
    pub next_steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "additional_details")]
    pub additional_details: Option<Vec<String>>,
}

/// Serde adapter: a single binary buffer as a base64 string
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: an ordered list of binary buffers as base64 strings
pub mod base64_buffers {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(buffers: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = buffers.iter().map(|b| STANDARD.encode(b)).collect();
        serializer.collect_seq(encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
