use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::analysis;
use crate::report::Message;
use crate::session_history;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    let system_config = &state.config.system_config;

    Router::new()
        // WebSocket
        .route("/client-ws", get(websocket_handler))
        // Health check
        .route("/api/health", get(health_check))
        // REST API routes
        .route("/api/analyze", post(analyze))
        .route("/api/sessions", get(list_sessions))
        .route(
            "/api/sessions/:session_uid",
            get(get_session).delete(remove_session),
        )
        // Rendered chart serving
        .nest_service("/charts", ServeDir::new(&system_config.chart_cache_dir))
}

async fn websocket_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    State(state): State<AppState>,
) -> axum::response::Response {
    crate::websocket::websocket_handler(ws, State(state)).await
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let sandbox_healthy = state.sandbox_service.health_check().await.unwrap_or(false);
    Json(json!({
        "status": "ok",
        "service": state.config.system_config.service_name,
        "description": state.config.system_config.service_description,
        "sandbox_service": sandbox_healthy
    }))
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut csv_buffer: Option<Vec<u8>> = None;
    let mut message: Option<String> = None;
    let mut session_uid: Option<String> = None;
    let mut history: Vec<Message> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(&format!("failed to read file field: {e}")))?;
                csv_buffer = Some(bytes.to_vec());
            }
            "message" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(&format!("failed to read message field: {e}")))?;
                message = Some(text);
            }
            "session_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(&format!("failed to read session_id field: {e}")))?;
                session_uid = Some(text);
            }
            "history" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(&format!("failed to read history field: {e}")))?;
                history = serde_json::from_str(&text).map_err(|e| {
                    bad_request(&format!("history field is not a valid message list: {e}"))
                })?;
            }
            _ => {}
        }
    }

    let csv_buffer = csv_buffer.ok_or_else(|| bad_request("file field is required"))?;
    let message = message.ok_or_else(|| bad_request("message field is required"))?;

    match analysis::run_agent_turn(&state, session_uid, csv_buffer, message, history).await {
        Ok(outcome) => {
            let mut body = serde_json::to_value(&outcome.output).map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": e.to_string()})),
                )
            })?;
            body["sessionId"] = json!(outcome.session_uid);
            body["chartUrls"] = json!(outcome.chart_urls);
            Ok(Json(body))
        }
        Err(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": e.to_string()})),
        )),
    }
}

async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let sessions = session_history::get_session_list(&state.session_history_dir())
        .map_err(internal_error)?;
    Ok(Json(json!({ "sessions": sessions })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_uid): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let history_dir = state.session_history_dir();
    let messages =
        session_history::get_history(&history_dir, &session_uid).map_err(internal_error)?;
    let report =
        session_history::get_report(&history_dir, &session_uid).map_err(internal_error)?;
    Ok(Json(json!({
        "session_uid": session_uid,
        "messages": messages,
        "report": report
    })))
}

async fn remove_session(
    State(state): State<AppState>,
    Path(session_uid): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    session_history::delete_session(&state.session_history_dir(), &session_uid)
        .map_err(internal_error)?;
    Ok(Json(json!({"success": true, "session_uid": session_uid})))
}

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}
