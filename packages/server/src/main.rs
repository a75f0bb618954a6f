use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::{info, warn, LevelFilter};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use traitors_server::{
    app, models::config::ServerConfig, services::game_service, state::AppState,
};

fn init_logger(level: LevelFilter) {
    Builder::new()
        .filter_level(level)
        .filter_module("tower_http", level)
        .filter_module("axum", level)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_result = dotenv();
    let config = ServerConfig::from_env();
    init_logger(config.log_level);
    if let Err(e) = dotenv_result {
        info!("No .env file loaded: {}", e);
    }

    let state = AppState::with_config(config.clone());
    game_service::spawn_reaper(state.clone());

    let app = app::create_app(state)
        .layer(cors_layer(&config))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        );

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Traitors server listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
