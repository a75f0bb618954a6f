use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use traitors_server::{app, state::AppState};

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

/// A lobby with the host plus `names`. Returns the code and every session in seat order.
async fn lobby(app: &Router, names: &[&str]) -> (String, Vec<String>) {
    let (status, created) = send(
        app,
        post(
            "/api/game/create",
            json!({"name": "Host", "num_traitors": 1, "theme": "werewolf"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = created["code"].as_str().unwrap().to_string();
    let mut sessions = vec![created["session_id"].as_str().unwrap().to_string()];

    for name in names {
        let (status, seat) = send(
            app,
            post(&format!("/api/game/{}/join", code), json!({"name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        sessions.push(seat["session_id"].as_str().unwrap().to_string());
    }
    (code, sessions)
}

#[tokio::test]
async fn test_create_and_join() {
    let app = app::create_app(AppState::new());
    let (code, sessions) = lobby(&app, &["Ann", "Ben"]).await;
    assert_eq!(code.len(), 4);

    let (status, view) = send(
        &app,
        get(&format!("/api/game/{}/view?session_id={}", code, sessions[2])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "LOBBY");
    assert_eq!(view["theme"], "werewolf");
    assert_eq!(view["me"]["id"], 3);
    assert_eq!(view["me"]["name"], "Ben");
    assert_eq!(view["lobby_players"].as_array().unwrap().len(), 3);
    assert!(view["host"].is_null());
    assert_eq!(view["details"]["kind"], "LOBBY");
}

#[tokio::test]
async fn test_join_with_lowercase_code() {
    let app = app::create_app(AppState::new());
    let (code, _) = lobby(&app, &[]).await;

    let (status, seat) = send(
        &app,
        post(
            &format!("/api/game/{}/join", code.to_lowercase()),
            json!({"name": "Ann"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seat["code"], code.as_str());
    assert_eq!(seat["player_id"], 2);
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let app = app::create_app(AppState::new());
    let (code, _) = lobby(&app, &["Ann"]).await;

    let (status, body) = send(
        &app,
        post(&format!("/api/game/{}/join", code), json!({"name": "ANN"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "INVALID_INPUT");
    assert_eq!(body["error"], "Name already taken");
}

#[tokio::test]
async fn test_bad_traitor_count_rejected() {
    let app = app::create_app(AppState::new());
    let (status, body) = send(
        &app,
        post(
            "/api/game/create",
            json!({"name": "Host", "num_traitors": 9}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_start_requires_host_and_players() {
    let app = app::create_app(AppState::new());
    let (code, sessions) = lobby(&app, &["Ann", "Ben"]).await;
    let actions = format!("/api/game/{}/actions", code);

    let (status, body) = send(
        &app,
        post(&actions, json!({"session_id": sessions[1], "action": "start_game"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "NOT_HOST");

    let (status, body) = send(
        &app,
        post(&actions, json!({"session_id": sessions[0], "action": "start_game"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Need at least 4 players");

    let (status, _) = send(
        &app,
        post(&format!("/api/game/{}/join", code), json!({"name": "Cat"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post(&actions, json!({"session_id": sessions[0], "action": "start_game"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "done");

    let (_, view) = send(
        &app,
        get(&format!("/api/game/{}/view?session_id={}", code, sessions[0])),
    )
    .await;
    assert_eq!(view["phase"], "ROLE_REVEAL");
    assert_eq!(view["round"], 1);
    assert_eq!(view["host"]["num_traitors"], 1);
    assert_eq!(view["host"]["can_proceed_to_night"], true);
    assert!(view["me"]["role"].is_string());
}

#[tokio::test]
async fn test_unknown_session_and_game() {
    let app = app::create_app(AppState::new());
    let (code, _) = lobby(&app, &[]).await;

    let (status, body) = send(
        &app,
        get(&format!("/api/game/{}/view?session_id=nobody", code)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "NOT_IN_GAME");

    let (status, body) = send(&app, get("/api/game/ZZZZ/view?session_id=nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_command_rejected() {
    let app = app::create_app(AppState::new());
    let (code, sessions) = lobby(&app, &[]).await;

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/game/{}/actions", code),
            json!({"session_id": sessions[0], "action": "summon_dragon"}),
        ))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_rejoin_rotates_session() {
    let app = app::create_app(AppState::new());
    let (code, sessions) = lobby(&app, &["Ann"]).await;

    let (status, seat) = send(
        &app,
        post(&format!("/api/game/{}/rejoin", code), json!({"name": "ann"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seat["player_id"], 2);
    let fresh = seat["session_id"].as_str().unwrap();
    assert_ne!(fresh, sessions[1]);

    let (status, _) = send(
        &app,
        get(&format!("/api/game/{}/view?session_id={}", code, sessions[1])),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, view) = send(
        &app,
        get(&format!("/api/game/{}/view?session_id={}", code, fresh)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["me"]["name"], "Ann");
}

#[tokio::test]
async fn test_last_lobby_leave_deletes_game() {
    let state = AppState::new();
    let app = app::create_app(state.clone());
    let (code, sessions) = lobby(&app, &["Ann"]).await;
    let leave = format!("/api/game/{}/leave", code);

    let (status, _) = send(&app, post(&leave, json!({"session_id": sessions[0]}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, view) = send(
        &app,
        get(&format!("/api/game/{}/view?session_id={}", code, sessions[1])),
    )
    .await;
    assert_eq!(view["me"]["is_host"], true);

    let (status, _) = send(&app, post(&leave, json!({"session_id": sessions[1]}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.games.lock().await.is_empty());
}
