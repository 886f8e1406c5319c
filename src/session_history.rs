use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::report::{Message, ReportData, Role};

/// One stored conversation entry. Metadata and report entries in the session
/// file use other role tags and are filtered out of conversation reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String, // "user" or "assistant"
    pub timestamp: String,
    pub content: String,
}

fn is_safe_filename(filename: &str) -> bool {
    if filename.is_empty() || filename.len() > 255 {
        return false;
    }

    let pattern = Regex::new(r"^[\w\-_\x{0020}-\x{007E}\x{00A0}-\x{FFFF}]+$").unwrap();
    pattern.is_match(filename)
}

pub(crate) fn sanitize_path_component(component: &str) -> Result<String> {
    let sanitized = Path::new(component)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid path component: {}", component))?
        .to_string();

    if !is_safe_filename(&sanitized) {
        return Err(anyhow::anyhow!(
            "Invalid characters in path component: {}",
            component
        ));
    }

    Ok(sanitized)
}

fn get_safe_session_path(history_dir: &Path, session_uid: &str) -> Result<PathBuf> {
    let safe_session_uid = sanitize_path_component(session_uid)?;
    let full_path = history_dir.join(format!("{}.json", safe_session_uid));

    // Ensure path is within history_dir (prevent path traversal)
    if !full_path.starts_with(history_dir) {
        return Err(anyhow::anyhow!("Invalid path: Path traversal detected"));
    }

    Ok(full_path)
}

fn read_entries(filepath: &Path) -> Result<Vec<serde_json::Value>> {
    if !filepath.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(filepath)?;
    Ok(serde_json::from_str(&content)?)
}

fn append_entry(filepath: &Path, entry: serde_json::Value) -> Result<()> {
    let mut entries = read_entries(filepath)?;
    entries.push(entry);
    fs::write(filepath, serde_json::to_string_pretty(&entries)?)?;
    Ok(())
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Create a new session file and return its uid.
/// Format: YYYY-MM-DD_HH-MM-SS_{uuid}
pub fn create_new_session(history_dir: &Path) -> Result<String> {
    fs::create_dir_all(history_dir)?;

    let now = Utc::now();
    let timestamp = now.format("%Y-%m-%d_%H-%M-%S").to_string();
    let uuid_hex = Uuid::new_v4().as_simple().to_string();
    let session_uid = format!("{}_{}", timestamp, uuid_hex);

    let filepath = history_dir.join(format!("{}.json", session_uid));
    let initial_data = vec![serde_json::json!({
        "role": "metadata",
        "timestamp": now.to_rfc3339()
    })];
    fs::write(&filepath, serde_json::to_string_pretty(&initial_data)?)?;
    tracing::debug!("Created new session file: {:?}", filepath);

    Ok(session_uid)
}

pub fn store_message(
    history_dir: &Path,
    session_uid: &str,
    role: Role,
    content: &str,
) -> Result<()> {
    let filepath = get_safe_session_path(history_dir, session_uid)?;
    append_entry(
        &filepath,
        serde_json::json!({
            "role": role_label(role),
            "timestamp": Utc::now().to_rfc3339(),
            "content": content
        }),
    )
}

/// Store a snapshot of the structured report produced for this session
pub fn store_report(history_dir: &Path, session_uid: &str, report: &ReportData) -> Result<()> {
    let filepath = get_safe_session_path(history_dir, session_uid)?;
    append_entry(
        &filepath,
        serde_json::json!({
            "role": "report",
            "timestamp": Utc::now().to_rfc3339(),
            "report": report
        }),
    )
}

/// Conversation entries for a session, oldest first. Metadata and report
/// entries are skipped.
pub fn get_history(history_dir: &Path, session_uid: &str) -> Result<Vec<SessionMessage>> {
    let filepath = get_safe_session_path(history_dir, session_uid)?;

    let mut history = Vec::new();
    for entry in read_entries(&filepath)? {
        let role = entry.get("role").and_then(|r| r.as_str()).unwrap_or("");
        if role != "user" && role != "assistant" {
            continue;
        }
        if let Ok(message) = serde_json::from_value::<SessionMessage>(entry) {
            history.push(message);
        }
    }

    Ok(history)
}

/// The most recent structured report stored for a session, if any
pub fn get_report(history_dir: &Path, session_uid: &str) -> Result<Option<ReportData>> {
    let filepath = get_safe_session_path(history_dir, session_uid)?;

    let mut latest = None;
    for entry in read_entries(&filepath)? {
        if entry.get("role").and_then(|r| r.as_str()) == Some("report") {
            if let Some(report) = entry.get("report") {
                if let Ok(report) = serde_json::from_value::<ReportData>(report.clone()) {
                    latest = Some(report);
                }
            }
        }
    }

    Ok(latest)
}

pub fn get_session_list(history_dir: &Path) -> Result<Vec<String>> {
    let mut session_list = Vec::new();

    if history_dir.exists() {
        for entry in fs::read_dir(history_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension() == Some(std::ffi::OsStr::new("json")) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    session_list.push(stem.to_string());
                }
            }
        }
    }

    // Filenames start with the timestamp, so a sort is chronological
    session_list.sort();
    session_list.reverse(); // Most recent first

    Ok(session_list)
}

pub fn delete_session(history_dir: &Path, session_uid: &str) -> Result<()> {
    let filepath = get_safe_session_path(history_dir, session_uid)?;

    if filepath.exists() {
        fs::remove_file(&filepath)?;
        tracing::debug!("Deleted session file: {:?}", filepath);
    }

    Ok(())
}

/// Convert stored entries into contract messages for agent replay
pub fn to_messages(history: &[SessionMessage]) -> Vec<Message> {
    history
        .iter()
        .filter_map(|entry| {
            let role = match entry.role.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                _ => return None,
            };
            Some(Message {
                role,
                content: entry.content.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "session_history_test.rs"]
mod tests;
