use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

use traitors_server::{
    app,
    services::game_service::{self, Seat},
    state::AppState,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app::create_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}", addr)
}

async fn connect(base: &str, seat: &Seat) -> Client {
    let url = format!(
        "{}/api/game/{}/ws?session_id={}",
        base, seat.code, seat.session_id
    );
    let (socket, _) = connect_async(url).await.expect("Failed to connect");
    socket
}

/// Next JSON text frame, skipping pings.
async fn next_json(socket: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a message")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Reads until a message of the given type arrives.
async fn next_of_type(socket: &mut Client, kind: &str) -> Value {
    loop {
        let value = next_json(socket).await;
        if value["type"] == kind {
            return value;
        }
    }
}

#[tokio::test]
async fn test_socket_receives_initial_state() {
    let state = AppState::new();
    let base = start_server(state.clone()).await;
    let host = game_service::create_game(&state, "Host", 1, None).await.unwrap();

    let mut socket = connect(&base, &host).await;
    let first = next_json(&mut socket).await;
    assert_eq!(first["type"], "game_state");
    assert_eq!(first["state"]["phase"], "LOBBY");
    assert_eq!(first["state"]["me"]["is_host"], true);
}

#[tokio::test]
async fn test_join_pushes_update() {
    let state = AppState::new();
    let base = start_server(state.clone()).await;
    let host = game_service::create_game(&state, "Host", 1, None).await.unwrap();

    let mut socket = connect(&base, &host).await;
    next_of_type(&mut socket, "game_state").await;

    game_service::join_game(&state, &host.code, "Ann").await.unwrap();
    let update = next_of_type(&mut socket, "game_state").await;
    assert_eq!(update["state"]["lobby_players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_command_over_socket() {
    let state = AppState::new();
    let base = start_server(state.clone()).await;
    let host = game_service::create_game(&state, "Host", 1, None).await.unwrap();
    let ann = game_service::join_game(&state, &host.code, "Ann").await.unwrap();

    let mut socket = connect(&base, &ann).await;
    next_of_type(&mut socket, "game_state").await;

    socket
        .send(Message::Text(json!({"action": "start_game"}).to_string()))
        .await
        .unwrap();
    let reply = next_of_type(&mut socket, "error").await;
    assert_eq!(reply["kind"], "NOT_HOST");

    socket
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();
    let reply = next_of_type(&mut socket, "error").await;
    assert_eq!(reply["kind"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_unknown_session_is_refused() {
    let state = AppState::new();
    let base = start_server(state.clone()).await;
    let host = game_service::create_game(&state, "Host", 1, None).await.unwrap();

    let url = format!("{}/api/game/{}/ws?session_id=intruder", base, host.code);
    assert!(connect_async(url).await.is_err());
}

#[tokio::test]
async fn test_closing_socket_leaves_lobby() {
    let state = AppState::new();
    let base = start_server(state.clone()).await;
    let host = game_service::create_game(&state, "Host", 1, None).await.unwrap();
    let ann = game_service::join_game(&state, &host.code, "Ann").await.unwrap();

    let mut socket = connect(&base, &ann).await;
    next_of_type(&mut socket, "game_state").await;
    socket.close(None).await.unwrap();

    let mut left = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let games = state.games.lock().await;
        let game = games.get(&host.code).unwrap();
        if game.player_by_session(&ann.session_id).is_none() {
            left = true;
            break;
        }
    }
    assert!(left, "closing the socket should remove the lobby seat");
}
