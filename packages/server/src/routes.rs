use crate::state::AppState;
use axum::Router;

mod game;

pub use game::{ActionRequest, CreateGameRequest, NameRequest, SessionRequest};

pub fn create_routes(state: AppState) -> Router {
    Router::new().nest("/api/game", game::routes(state))
}
