use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::{
    models::{
        command::GameCommand,
        error::{ErrorKind, GameError},
    },
    services::game_service,
    utils::websocket,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub name: String,
    pub num_traitors: usize,
    #[serde(default)]
    pub theme: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    pub session_id: String,
    #[serde(flatten)]
    pub command: GameCommand,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: ErrorKind,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NotInGame => StatusCode::UNAUTHORIZED,
        ErrorKind::NotHost | ErrorKind::NotAllowed => StatusCode::FORBIDDEN,
        ErrorKind::WrongPhase | ErrorKind::NotReady => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = ErrorBody {
            error: self.to_string(),
            kind,
        };
        (status_for(kind), Json(body)).into_response()
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/create", post(create_game_handler))
        .nest(
            "/:code",
            Router::new()
                .route("/join", post(join_game_handler))
                .route("/rejoin", post(rejoin_game_handler))
                .route("/leave", post(leave_game_handler))
                .route("/view", get(get_view_handler))
                .route("/actions", post(action_handler))
                .route("/ws", get(websocket::handler)),
        )
        .with_state(state)
}

async fn create_game_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Response {
    match game_service::create_game(&state, &req.name, req.num_traitors, req.theme.as_deref())
        .await
    {
        Ok(seat) => (StatusCode::CREATED, Json(seat)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn join_game_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<NameRequest>,
) -> Response {
    match game_service::join_game(&state, &code, &req.name).await {
        Ok(seat) => (StatusCode::OK, Json(seat)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn rejoin_game_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<NameRequest>,
) -> Response {
    match game_service::rejoin_game(&state, &code, &req.name).await {
        Ok(seat) => (StatusCode::OK, Json(seat)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn leave_game_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<SessionRequest>,
) -> Response {
    match game_service::leave_game(&state, &code, &req.session_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_view_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<SessionRequest>,
) -> Result<impl IntoResponse, GameError> {
    let view = game_service::get_view(&state, &code, &query.session_id).await?;
    Ok(Json(view))
}

async fn action_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, GameError> {
    let outcome =
        game_service::handle_command(&state, &code, &req.session_id, req.command).await?;
    Ok(Json(outcome))
}
