use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::analysis;
use crate::session_history;
use crate::state::AppState;

pub async fn handle_message(
    state: &AppState,
    client_uid: &str,
    text: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let msg: Value = serde_json::from_str(text)?;
    let msg_type = msg.get("type").and_then(|v| v.as_str());

    match msg_type {
        Some("analyze") => {
            handle_analyze(state, client_uid, &msg, sender)?;
        }
        Some("interrupt-signal") => {
            handle_interrupt(state, client_uid);
        }
        Some("fetch-session-list") => {
            handle_session_list(state, sender)?;
        }
        Some("fetch-and-set-session") => {
            handle_fetch_session(state, client_uid, &msg, sender)?;
        }
        Some("create-new-session") => {
            handle_create_session(state, client_uid, sender)?;
        }
        Some("delete-session") => {
            handle_delete_session(state, client_uid, &msg, sender)?;
        }
        _ => {
            warn!("Unknown message type: {:?}", msg_type);
        }
    }

    Ok(())
}

fn handle_analyze(
    state: &AppState,
    client_uid: &str,
    msg: &Value,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let encoded = msg.get("csv_data").and_then(|v| v.as_str()).unwrap_or("");
    let user_message = msg
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    if encoded.is_empty() || user_message.is_empty() {
        let _ = sender.send(
            json!({"type": "error", "text": "csv_data and message are required"}).to_string(),
        );
        return Ok(());
    }

    let csv_buffer = match BASE64.decode(encoded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = sender.send(
                json!({"type": "error", "text": format!("csv_data is not valid base64: {e}")})
                    .to_string(),
            );
            return Ok(());
        }
    };

    // An explicit session in the message wins over the connection's current one
    let session_uid = msg
        .get("session_uid")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            state
                .client_contexts
                .get(client_uid)
                .and_then(|c| c.value().session_uid.clone())
        });

    let task_state = state.clone();
    let task_sender = sender.clone();
    let task_client_uid = client_uid.to_string();
    let handle = tokio::spawn(async move {
        let _ = analysis::process_analysis(
            &task_state,
            &task_client_uid,
            session_uid,
            csv_buffer,
            user_message,
            &task_sender,
        )
        .await;
        task_state.analysis_tasks.remove(&task_client_uid);
    });

    // One running analysis per client; a new request supersedes the old
    if let Some(previous) = state
        .analysis_tasks
        .insert(client_uid.to_string(), handle.abort_handle())
    {
        previous.abort();
    }

    Ok(())
}

fn handle_interrupt(state: &AppState, client_uid: &str) {
    info!("Interrupt signal from {}", client_uid);

    if let Some((_, handle)) = state.analysis_tasks.remove(client_uid) {
        handle.abort();
    }
}

fn handle_session_list(state: &AppState, sender: &UnboundedSender<String>) -> anyhow::Result<()> {
    let sessions = session_history::get_session_list(&state.session_history_dir())?;
    let _ = sender.send(
        json!({
            "type": "session-list",
            "sessions": sessions
        })
        .to_string(),
    );
    Ok(())
}

fn handle_fetch_session(
    state: &AppState,
    client_uid: &str,
    msg: &Value,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let session_uid = msg.get("session_uid").and_then(|v| v.as_str());

    if let Some(uid) = session_uid {
        if let Some(mut context) = state.client_contexts.get_mut(client_uid) {
            context.value_mut().session_uid = Some(uid.to_string());
        }

        let history_dir = state.session_history_dir();
        let messages = session_history::get_history(&history_dir, uid)?;
        let report = session_history::get_report(&history_dir, uid)?;
        let _ = sender.send(
            json!({
                "type": "session-data",
                "session_uid": uid,
                "messages": messages,
                "report": report
            })
            .to_string(),
        );
    }

    Ok(())
}

fn handle_create_session(
    state: &AppState,
    client_uid: &str,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let session_uid = session_history::create_new_session(&state.session_history_dir())?;

    if let Some(mut context) = state.client_contexts.get_mut(client_uid) {
        context.value_mut().session_uid = Some(session_uid.clone());
    }

    let _ = sender.send(
        json!({
            "type": "new-session-created",
            "session_uid": session_uid
        })
        .to_string(),
    );

    Ok(())
}

fn handle_delete_session(
    state: &AppState,
    client_uid: &str,
    msg: &Value,
    sender: &UnboundedSender<String>,
) -> anyhow::Result<()> {
    let session_uid = msg.get("session_uid").and_then(|v| v.as_str());

    if let Some(uid) = session_uid {
        session_history::delete_session(&state.session_history_dir(), uid)?;

        // Clear if it's the connection's current session
        if let Some(mut context) = state.client_contexts.get_mut(client_uid) {
            if context.value().session_uid.as_deref() == Some(uid) {
                context.value_mut().session_uid = None;
            }
        }

        let _ = sender.send(
            json!({
                "type": "session-deleted",
                "success": true,
                "session_uid": uid
            })
            .to_string(),
        );
    }

    Ok(())
}
