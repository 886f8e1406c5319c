use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::interface::AgentInterface;
use crate::agent::report_extractor;
use crate::agent::stateless_llm::StatelessLLMInterface;
use crate::csv_profile;
use crate::report::{AgentInput, AgentOutput, Message, ReportData};
use crate::sandbox_service::SandboxServiceClient;

/// Filename the dataset gets inside the sandbox working directory; generated
/// code is told to read it from there
const DATASET_FILENAME: &str = "data.csv";

const ANALYSIS_GUIDANCE: &str = "\
You are analyzing a CSV dataset on behalf of the user. The dataset profile and \
sample rows are included in each message. When a visualization would help, write \
Python code in ```python fenced blocks. The code runs with pandas and matplotlib \
available; load the dataset with `df = pd.read_csv('data.csv')` and save every \
figure with `plt.savefig(...)`. Keep prose outside the code blocks.";

const REPORT_INSTRUCTION: &str = "\
Now produce the structured report for this analysis as a single JSON object with \
the shape {\"summary\": string, \"kpis\": [string], \"charts\": [{\"title\": string, \
\"bullets\": [string]}], \"externalContext\": [string]?, \"nextSteps\": [string]?, \
\"additionalDetails\": [string]?}. Include one charts entry per figure you created, \
in the same order. Respond with the JSON object and nothing else.";

/// Agent that keeps conversation memory and turns a CSV plus a question into
/// a prose summary, rendered charts and a structured report.
pub struct DataAnalystAgent {
    memory: Vec<Message>,
    llm: Arc<dyn StatelessLLMInterface>,
    system: String,
    sandbox: Arc<SandboxServiceClient>,
    max_code_retries: u32,
    max_history_turns: usize,
}

impl DataAnalystAgent {
    pub fn new(
        llm: Arc<dyn StatelessLLMInterface>,
        system: String,
        sandbox: Arc<SandboxServiceClient>,
        max_code_retries: u32,
        max_history_turns: usize,
    ) -> Self {
        let mut agent = Self {
            memory: Vec::new(),
            llm,
            system: String::new(),
            sandbox,
            max_code_retries,
            max_history_turns,
        };
        agent.set_system(system);
        info!("DataAnalystAgent initialized.");
        agent
    }

    /// Set the system prompt, extending it with the analysis ground rules
    pub fn set_system(&mut self, system: String) {
        debug!("Analyst agent: setting system prompt: '''{}'''", system);
        self.system = format!("{}\n\n{}", system, ANALYSIS_GUIDANCE);
    }

    /// Execute the extracted code blocks in a fresh sandbox session and
    /// collect every rendered image, preserving creation order.
    async fn run_code_blocks(
        &self,
        csv_buffer: &[u8],
        blocks: &[String],
    ) -> Result<Vec<Vec<u8>>, anyhow::Error> {
        let session = self.sandbox.create_session().await?;
        let result = self.execute_in_session(&session, csv_buffer, blocks).await;
        self.sandbox.close_session(&session).await;
        result
    }

    async fn execute_in_session(
        &self,
        session: &str,
        csv_buffer: &[u8],
        blocks: &[String],
    ) -> Result<Vec<Vec<u8>>, anyhow::Error> {
        self.sandbox
            .upload_csv(session, DATASET_FILENAME, csv_buffer)
            .await?;

        let mut images = Vec::new();
        for block in blocks {
            let mut attempt = block.clone();
            let mut retries = 0u32;
            loop {
                let result = self.sandbox.run_code(session, &attempt).await?;
                if !result.stdout.is_empty() {
                    debug!("Sandbox stdout: {}", result.stdout.trim_end());
                }
                if !result.stderr.is_empty() {
                    debug!("Sandbox stderr: {}", result.stderr.trim_end());
                }
                match result.error {
                    None => {
                        images.extend(result.images);
                        break;
                    }
                    Some(error) if retries < self.max_code_retries => {
                        retries += 1;
                        debug!("Generated code failed, asking for a fix: {}", error);
                        match self.repair_code(&attempt, &error).await {
                            Ok(fixed) => attempt = fixed,
                            Err(e) => {
                                warn!("Code repair pass failed, skipping block: {}", e);
                                break;
                            }
                        }
                    }
                    Some(error) => {
                        warn!("Code block failed after retry, skipping: {}", error);
                        break;
                    }
                }
            }
        }
        Ok(images)
    }

    /// One-shot repair pass: hand the model its own traceback
    async fn repair_code(&self, code: &str, error: &str) -> Result<String, anyhow::Error> {
        let prompt = format!(
            "The following Python code failed inside the analysis sandbox.\n\n\
             ```python\n{code}\n```\n\nError:\n{error}\n\n\
             Return the corrected code as a single ```python block and nothing else."
        );
        let response = self
            .llm
            .chat_completion(vec![Message::user(prompt)], Some(&self.system))
            .await?;
        report_extractor::extract_python_blocks(&response)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("repair response contained no code block"))
    }

    /// Second LLM pass: the structured report. Failures degrade to a turn
    /// without a structured report rather than failing the analysis.
    async fn structured_report_pass(
        &self,
        mut messages: Vec<Message>,
        analysis: &str,
    ) -> (Option<ReportData>, Value) {
        messages.push(Message::assistant(analysis.to_string()));
        messages.push(Message::user(REPORT_INSTRUCTION));

        match self.llm.chat_completion(messages, Some(&self.system)).await {
            Ok(raw) => {
                let value = report_extractor::extract_json_value(&raw).unwrap_or(Value::Null);
                let report = report_extractor::parse_report(&raw);
                if report.is_none() {
                    warn!("Structured report did not validate, returning raw insights only");
                }
                (report, value)
            }
            Err(e) => {
                warn!("Structured report pass failed: {}", e);
                (None, Value::Null)
            }
        }
    }
}

#[async_trait]
impl AgentInterface for DataAnalystAgent {
    async fn analyze(&mut self, input: AgentInput) -> Result<AgentOutput, anyhow::Error> {
        let profile = csv_profile::profile_csv(&input.csv_buffer)?;

        // A request that carries its own history replaces working memory
        if !input.conversation_history.is_empty() {
            self.memory = input.conversation_history.clone();
        }

        let messages = build_turn_messages(
            &self.memory,
            self.max_history_turns,
            &profile.render_prompt(),
            &input.user_message,
        );

        let analysis = self
            .llm
            .chat_completion(messages.clone(), Some(&self.system))
            .await?;

        let code_blocks = report_extractor::extract_python_blocks(&analysis);
        let mut charts = Vec::new();
        if !code_blocks.is_empty() {
            match self.run_code_blocks(&input.csv_buffer, &code_blocks).await {
                Ok(images) => charts = images,
                Err(e) => warn!("Sandbox execution failed, continuing without charts: {}", e),
            }
        }

        let (structured_report, insights) =
            self.structured_report_pass(messages, &analysis).await;

        let summary = report_extractor::strip_code_fences(&analysis);
        let external_context = structured_report
            .as_ref()
            .and_then(|r| r.external_context.as_ref())
            .map(|lines| lines.join("\n"));

        self.memory.push(Message::user(input.user_message.clone()));
        self.memory.push(Message::assistant(summary.clone()));

        Ok(AgentOutput {
            summary,
            charts,
            external_context,
            structured_report,
            insights,
        })
    }

    fn set_memory_from_history(&mut self, messages: Vec<Message>) {
        self.memory = messages;
    }
}

/// Assemble the prompt for one turn: trimmed history, then the user message
/// with the dataset profile attached.
fn build_turn_messages(
    history: &[Message],
    max_history_turns: usize,
    profile_block: &str,
    user_message: &str,
) -> Vec<Message> {
    let keep = max_history_turns.saturating_mul(2);
    let start = history.len().saturating_sub(keep);
    let mut messages: Vec<Message> = history[start..].to_vec();

    messages.push(Message::user(format!(
        "{profile_block}\nQuestion: {user_message}"
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_message_includes_profile_and_question() {
        let messages = build_turn_messages(&[], 10, "Dataset: 2 rows x 1 columns\n", "sum it");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("Dataset: 2 rows"));
        assert!(messages[0].content.ends_with("Question: sum it"));
    }

    #[test]
    fn history_is_trimmed_oldest_first() {
        let history: Vec<Message> = (0..10)
            .flat_map(|i| {
                vec![
                    Message::user(format!("q{i}")),
                    Message::assistant(format!("a{i}")),
                ]
            })
            .collect();

        let messages = build_turn_messages(&history, 3, "profile", "next");
        // 3 turns of history (6 messages) plus the new user message.
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0].content, "q7");
        assert_eq!(messages[5].content, "a9");
    }
}
