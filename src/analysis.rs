use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use std::fs;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::report::{AgentInput, AgentOutput, Message, Role};
use crate::session_history;
use crate::state::AppState;

/// Outcome of one analysis turn plus where it was stored
pub struct TurnOutcome {
    pub session_uid: String,
    pub output: AgentOutput,
    pub chart_urls: Vec<String>,
}

/// Run one agent turn: resolve the session, replay its history, drive the
/// agent, persist the turn and cache rendered charts.
pub async fn run_agent_turn(
    state: &AppState,
    session_uid: Option<String>,
    csv_buffer: Vec<u8>,
    user_message: String,
    provided_history: Vec<Message>,
) -> Result<TurnOutcome> {
    let history_dir = state.session_history_dir();
    let session_uid = match session_uid {
        Some(uid) if !uid.is_empty() => uid,
        _ => session_history::create_new_session(&history_dir)?,
    };

    let mut agent = state.create_agent()?;

    // A request that ships its own history wins over the stored one
    if provided_history.is_empty() {
        let stored = session_history::get_history(&history_dir, &session_uid)?;
        agent.set_memory_from_history(session_history::to_messages(&stored));
    }

    let input = AgentInput {
        csv_buffer,
        user_message: user_message.clone(),
        conversation_history: provided_history,
    };
    let output = agent.analyze(input).await?;

    session_history::store_message(&history_dir, &session_uid, Role::User, &user_message)?;
    session_history::store_message(&history_dir, &session_uid, Role::Assistant, &output.summary)?;
    if let Some(report) = &output.structured_report {
        session_history::store_report(&history_dir, &session_uid, report)?;
    }

    let chart_urls = cache_charts(state, &session_uid, &output.charts)?;

    Ok(TurnOutcome {
        session_uid,
        output,
        chart_urls,
    })
}

/// Write rendered charts into the cache dir so clients can link them as
/// `/charts/{session}/chart_{n}.png`
fn cache_charts(state: &AppState, session_uid: &str, charts: &[Vec<u8>]) -> Result<Vec<String>> {
    if charts.is_empty() {
        return Ok(Vec::new());
    }

    let safe_session = session_history::sanitize_path_component(session_uid)?;
    let session_dir = state.chart_cache_dir().join(&safe_session);
    fs::create_dir_all(&session_dir)?;

    let mut urls = Vec::with_capacity(charts.len());
    for (i, chart) in charts.iter().enumerate() {
        let filename = format!("chart_{i}.png");
        fs::write(session_dir.join(&filename), chart)?;
        urls.push(format!("/charts/{safe_session}/{filename}"));
    }
    Ok(urls)
}

/// Drive one analysis turn for a WebSocket client, streaming progress events
pub async fn process_analysis(
    state: &AppState,
    client_uid: &str,
    session_uid: Option<String>,
    csv_buffer: Vec<u8>,
    user_message: String,
    sender: &UnboundedSender<String>,
) -> Result<()> {
    info!("Processing analysis for {}", client_uid);

    let _ = sender.send(json!({"type": "analysis-start"}).to_string());
    let _ = sender.send(json!({"type": "status", "text": "Analyzing dataset"}).to_string());

    match run_agent_turn(state, session_uid, csv_buffer, user_message, Vec::new()).await {
        Ok(outcome) => {
            for (i, chart) in outcome.output.charts.iter().enumerate() {
                let _ = sender.send(
                    json!({
                        "type": "chart",
                        "index": i,
                        "data": BASE64.encode(chart),
                        "url": outcome.chart_urls.get(i),
                    })
                    .to_string(),
                );
            }
            if let Some(report) = &outcome.output.structured_report {
                let _ = sender.send(json!({"type": "report", "report": report}).to_string());
            }
            let _ = sender.send(
                json!({"type": "full-text", "text": outcome.output.summary}).to_string(),
            );
            let _ = sender.send(
                json!({"type": "analysis-complete", "session_uid": outcome.session_uid})
                    .to_string(),
            );

            // Remember the session for follow-up turns on this connection
            if let Some(mut context) = state.client_contexts.get_mut(client_uid) {
                context.value_mut().session_uid = Some(outcome.session_uid);
            }
        }
        Err(e) => {
            error!("Analysis failed for {}: {}", client_uid, e);
            let _ = sender.send(json!({"type": "error", "text": e.to_string()}).to_string());
        }
    }

    Ok(())
}
