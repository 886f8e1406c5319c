use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::Response,
};
use axum::extract::ws::WebSocket;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{error, info};

use crate::handlers;
use crate::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_uid = state.generate_client_uid();
    info!("New WebSocket connection: {}", client_uid);

    // Initialize client context
    let context = crate::state::ClientContext {
        client_uid: client_uid.clone(),
        session_uid: None,
    };
    state.client_contexts.insert(client_uid.clone(), context);

    let (mut sink, mut receiver) = socket.split();

    // Outbound messages flow through a channel so spawned analysis tasks can
    // stream progress while this loop keeps reading
    let (sender, mut outbound) = tokio::sync::mpsc::unbounded_channel::<String>();
    let forward_task = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let initial_messages = vec![
        json!({
            "type": "full-text",
            "text": "Connection established"
        }),
        json!({
            "type": "set-service-info",
            "service_name": state.config.system_config.service_name,
            "service_description": state.config.system_config.service_description,
            "client_uid": client_uid
        }),
    ];

    for msg in initial_messages {
        if sender.send(msg.to_string()).is_err() {
            error!("Failed to send initial message");
            break;
        }
    }

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handlers::handle_message(&state, &client_uid, &text, &sender).await
                {
                    error!("Error handling message: {}", e);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", client_uid);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    // Cleanup
    state.client_contexts.remove(&client_uid);

    // Cancel any running analysis task
    if let Some((_, handle)) = state.analysis_tasks.remove(&client_uid) {
        handle.abort();
    }

    forward_task.abort();
    info!("Cleaned up client {}", client_uid);
}
