use log::debug;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};

use crate::models::{config::ServerConfig, player::PlayerId, reveal::RevealKind};
use crate::services::game_store::{normalize_code, GameStore};

/// Fan-out notifications for one game. Sockets turn `StateChanged` into a fresh
/// per-player view; the other events are forwarded as-is.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    StateChanged,
    PlayerDisconnected {
        player_id: PlayerId,
        name: String,
    },
    Revealed {
        kind: RevealKind,
        item: serde_json::Value,
    },
    Closed,
}

#[derive(Clone)]
pub struct AppState {
    pub games: Arc<Mutex<GameStore>>,
    pub channels: Arc<Mutex<HashMap<String, broadcast::Sender<GameEvent>>>>,
    pub config: Arc<ServerConfig>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_store(GameStore::new(), config)
    }

    pub fn with_store(store: GameStore, config: ServerConfig) -> Self {
        AppState {
            games: Arc::new(Mutex::new(store)),
            channels: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub async fn get_or_create_game_channel(&self, code: &str) -> broadcast::Sender<GameEvent> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(normalize_code(code))
            .or_insert_with(|| broadcast::channel(1000).0)
            .clone()
    }

    pub async fn notify(&self, code: &str, event: GameEvent) {
        let tx = self.get_or_create_game_channel(code).await;
        if tx.send(event).is_err() {
            debug!("No subscribers for game {}", code);
        }
    }

    pub async fn broadcast_state(&self, code: &str) {
        self.notify(code, GameEvent::StateChanged).await;
    }

    /// Tells every socket the game is gone and drops its channel.
    pub async fn close_channel(&self, code: &str) {
        if let Some(tx) = self.channels.lock().await.remove(&normalize_code(code)) {
            let _ = tx.send(GameEvent::Closed);
        }
    }
}
