use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};

use crate::{
    models::{
        command::{CommandOutcome, GameCommand},
        error::{ErrorKind, GameError},
        player::PlayerId,
        reveal::RevealKind,
        view::GameView,
    },
    routes::SessionRequest,
    services::game_service,
    state::{AppState, GameEvent},
};

/// Everything the server pushes down a socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState { state: GameView },
    PlayerDisconnected { player_id: PlayerId, name: String },
    Revealed { kind: RevealKind, item: serde_json::Value },
    CommandResult { outcome: CommandOutcome },
    Error { error: String, kind: ErrorKind },
    GameClosed,
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            kind: e.kind(),
            error: e.to_string(),
        }
    }
}

impl ServerMessage {
    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text)),
            Err(e) => {
                warn!("Failed to encode socket message: {}", e);
                None
            }
        }
    }
}

pub async fn handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<SessionRequest>,
    ws: WebSocketUpgrade,
) -> Response {
    // reject unknown sessions before upgrading
    if let Err(e) = game_service::resolve_session(&state, &code, &query.session_id).await {
        return e.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, code, query.session_id))
}

/// Builds this socket's message for a channel event. `None` for a session that no
/// longer owns a seat.
async fn render(state: &AppState, code: &str, session_id: &str, event: GameEvent) -> Option<ServerMessage> {
    let message = match event {
        GameEvent::StateChanged => ServerMessage::GameState {
            state: game_service::get_view(state, code, session_id).await.ok()?,
        },
        GameEvent::PlayerDisconnected { player_id, name } => {
            ServerMessage::PlayerDisconnected { player_id, name }
        }
        GameEvent::Revealed { kind, item } => ServerMessage::Revealed { kind, item },
        GameEvent::Closed => ServerMessage::GameClosed,
    };
    Some(message)
}

pub async fn handle_socket(ws: WebSocket, state: AppState, code: String, session_id: String) {
    info!("WebSocket connected to game {}", code);
    let tx = state.get_or_create_game_channel(&code).await;
    let mut rx = tx.subscribe();

    let (mut sender, mut receiver) = ws.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // a fresh socket gets the current view straight away
    if let Some(initial) = render(&state, &code, &session_id, GameEvent::StateChanged).await {
        let _ = reply_tx.send(initial);
    }

    let send_state = state.clone();
    let send_code = code.clone();
    let send_session = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                event = rx.recv() => match event {
                    Ok(GameEvent::Closed) => {
                        if let Some(msg) = ServerMessage::GameClosed.to_message() {
                            let _ = sender.send(msg).await;
                        }
                        break;
                    }
                    Ok(event) => {
                        match render(&send_state, &send_code, &send_session, event).await {
                            Some(msg) => msg,
                            None => {
                                debug!("Session for game {} was replaced, closing socket", send_code);
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Socket for game {} lagged by {} events", send_code, skipped);
                        match render(&send_state, &send_code, &send_session, GameEvent::StateChanged).await {
                            Some(msg) => msg,
                            None => break,
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
            };

            let Some(msg) = outgoing.to_message() else {
                continue;
            };
            if let Err(e) = sender.send(msg).await {
                debug!("Error sending to game {} socket: {}", send_code, e);
                break;
            }
        }
        let _ = sender.close().await;
    });

    let recv_state = state.clone();
    let recv_code = code.clone();
    let recv_session = session_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match serde_json::from_str::<GameCommand>(&text) {
                Ok(cmd) => {
                    match game_service::handle_command(&recv_state, &recv_code, &recv_session, cmd)
                        .await
                    {
                        Ok(outcome) => ServerMessage::CommandResult { outcome },
                        Err(e) => e.into(),
                    }
                }
                Err(e) => ServerMessage::Error {
                    error: format!("Malformed command: {}", e),
                    kind: ErrorKind::InvalidInput,
                },
            };
            if reply_tx.send(reply).is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    info!("WebSocket closed for game {}", code);
    if let Err(e) = game_service::leave_game(&state, &code, &session_id).await {
        debug!("Disconnect cleanup for game {}: {}", code, e);
    }
}
