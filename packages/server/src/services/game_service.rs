use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    models::{
        command::{CommandOutcome, GameCommand},
        error::GameError,
        game::{Departure, GamePhase},
        player::PlayerId,
        reveal::RevealKind,
        role::Theme,
        view::GameView,
    },
    services::{game_store::normalize_code, reveal_scheduler},
    state::{AppState, GameEvent},
};

/// Where a client sits: returned by create, join and rejoin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub code: String,
    pub player_id: PlayerId,
    pub session_id: String,
}

fn new_session() -> String {
    Uuid::new_v4().to_string()
}

fn validate_code(code: &str) -> Result<String, GameError> {
    let code = normalize_code(code);
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GameError::InvalidCode);
    }
    Ok(code)
}

pub async fn create_game(
    state: &AppState,
    host_name: &str,
    num_traitors: usize,
    theme: Option<&str>,
) -> Result<Seat, GameError> {
    let session_id = new_session();
    let theme = Theme::from_name(theme);
    let (code, player_id) =
        state
            .games
            .lock()
            .await
            .create(host_name, &session_id, num_traitors, theme)?;

    info!(
        "Game {} created by {} ({} traitors, theme {:?})",
        code,
        host_name.trim(),
        num_traitors,
        theme
    );
    Ok(Seat {
        code,
        player_id,
        session_id,
    })
}

pub async fn join_game(state: &AppState, code: &str, name: &str) -> Result<Seat, GameError> {
    let code = validate_code(code)?;
    let session_id = new_session();
    let player_id = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&code).ok_or(GameError::GameNotFound)?;
        game.add_player(name, session_id.clone())?
    };

    info!("{} joined game {} as player {}", name.trim(), code, player_id);
    state.broadcast_state(&code).await;
    Ok(Seat {
        code,
        player_id,
        session_id,
    })
}

/// Hands an existing seat a fresh session. The old session stops working.
pub async fn rejoin_game(state: &AppState, code: &str, name: &str) -> Result<Seat, GameError> {
    let code = validate_code(code)?;
    let session_id = new_session();
    let player_id = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&code).ok_or(GameError::GameNotFound)?;
        game.rejoin(name, session_id.clone())?
    };

    info!("Player {} rejoined game {}", player_id, code);
    state.broadcast_state(&code).await;
    Ok(Seat {
        code,
        player_id,
        session_id,
    })
}

/// Explicit leave or dropped socket. A session that no longer maps to a seat (it was
/// rotated by a rejoin) is ignored.
pub async fn leave_game(state: &AppState, code: &str, session_id: &str) -> Result<(), GameError> {
    let code = validate_code(code)?;
    let departure = {
        let mut games = state.games.lock().await;
        let Some(game) = games.get_mut(&code) else {
            return Err(GameError::GameNotFound);
        };
        let Some(player) = game.player_by_session(session_id) else {
            debug!("Stale session left game {}", code);
            return Ok(());
        };
        let (player_id, name) = (player.id, player.name.clone());
        let departure = game.remove_player(player_id)?;
        if departure == (Departure::Removed { now_empty: true }) {
            games.delete(&code);
        }
        (departure, player_id, name)
    };

    match departure {
        (Departure::Removed { now_empty: true }, _, _) => {
            info!("Game {} is empty and was removed", code);
            state.close_channel(&code).await;
        }
        (Departure::Removed { .. }, player_id, _) => {
            info!("Player {} left game {}", player_id, code);
            state.broadcast_state(&code).await;
        }
        (Departure::Disconnected, player_id, name) => {
            info!("Player {} disconnected from game {}", player_id, code);
            state
                .notify(&code, GameEvent::PlayerDisconnected { player_id, name })
                .await;
            state.broadcast_state(&code).await;
        }
    }
    Ok(())
}

pub async fn resolve_session(
    state: &AppState,
    code: &str,
    session_id: &str,
) -> Result<PlayerId, GameError> {
    let code = validate_code(code)?;
    let games = state.games.lock().await;
    let game = games.get(&code).ok_or(GameError::GameNotFound)?;
    game.player_by_session(session_id)
        .map(|p| p.id)
        .ok_or(GameError::NotInGame)
}

pub async fn get_view(state: &AppState, code: &str, session_id: &str) -> Result<GameView, GameError> {
    let code = validate_code(code)?;
    let games = state.games.lock().await;
    let game = games.get(&code).ok_or(GameError::GameNotFound)?;
    let observer = game
        .player_by_session(session_id)
        .ok_or(GameError::NotInGame)?;
    Ok(game.view_for(observer))
}

/// Applies a command from the player holding `session_id`, then fans out the new state
/// and starts any reveal the command kicked off.
pub async fn handle_command(
    state: &AppState,
    code: &str,
    session_id: &str,
    cmd: GameCommand,
) -> Result<CommandOutcome, GameError> {
    let code = validate_code(code)?;
    let action = cmd.name();
    let reveal = cmd.starts_reveal();

    let (outcome, before, after, round) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&code).ok_or(GameError::GameNotFound)?;
        let actor = game
            .player_by_session(session_id)
            .map(|p| p.id)
            .ok_or(GameError::NotInGame)?;
        let before = game.phase();
        let outcome = game.apply(actor, cmd).map_err(|e| {
            debug!("Game {}: {} by player {} rejected: {}", code, action, actor, e);
            e
        })?;
        (outcome, before, game.phase(), game.round())
    };

    if before != after {
        info!(
            "Game {} round {}: {} moved {} -> {}",
            code, round, action, before, after
        );
    }
    log_outcome(&code, &outcome);
    state.broadcast_state(&code).await;

    if let Some(kind) = reveal {
        reveal_scheduler::spawn(state.clone(), code.clone(), kind);
    }
    if after == GamePhase::GameOver && before != GamePhase::GameOver {
        reveal_scheduler::spawn(state.clone(), code.clone(), RevealKind::Roles);
    }
    Ok(outcome)
}

fn log_outcome(code: &str, outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::LockIn { result } => info!("Game {}: night lock-in {:?}", code, result),
        CommandOutcome::Banishment { result } => info!(
            "Game {}: player {} banished (traitor: {}), next {:?}",
            code, result.banished, result.was_traitor, result.then
        ),
        CommandOutcome::EndGameVote { result } => {
            info!("Game {}: end-game vote resolved {:?}", code, result)
        }
        CommandOutcome::Votes { resolution } => {
            info!("Game {}: votes resolved {:?}", code, resolution)
        }
        CommandOutcome::Done | CommandOutcome::VoteCast { .. } => {}
    }
}

/// Evicts stale games on the configured interval.
pub fn spawn_reaper(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.reap_interval);
        loop {
            ticker.tick().await;
            reap_once(&state).await;
        }
    })
}

pub async fn reap_once(state: &AppState) -> Vec<String> {
    let removed = state.games.lock().await.reap(
        Utc::now(),
        state.config.game_idle_ttl,
        state.config.finished_game_ttl,
    );
    for code in &removed {
        info!("Reaped game {}", code);
        state.close_channel(code).await;
    }
    removed
}
