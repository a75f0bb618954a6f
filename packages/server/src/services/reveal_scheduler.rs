use log::{debug, info};
use serde::Serialize;
use tokio::{task::JoinHandle, time::sleep};

use crate::{
    models::{game::Game, reveal::Revealed, reveal::RevealKind},
    state::{AppState, GameEvent},
};

/// Drives one drip reveal on its own task: an opening pause, one item per interval
/// with a broadcast after each, then (for reveals that need it) a closing pause and
/// the completion call.
pub fn spawn(state: AppState, code: String, kind: RevealKind) -> JoinHandle<()> {
    tokio::spawn(async move { run(state, code, kind).await })
}

async fn run(state: AppState, code: String, kind: RevealKind) {
    let config = state.config.clone();
    let opening = match kind {
        RevealKind::Roles => config.role_reveal_initial_delay,
        _ => config.reveal_initial_delay,
    };
    sleep(opening).await;

    loop {
        let step = {
            let mut games = state.games.lock().await;
            let Some(game) = games.get_mut(&code) else {
                debug!("Game {} is gone, stopping {:?} reveal", code, kind);
                return;
            };
            next_item(game, kind)
        };

        let Some((item, is_last)) = step else {
            break;
        };
        state.notify(&code, GameEvent::Revealed { kind, item }).await;
        state.broadcast_state(&code).await;
        if is_last {
            break;
        }
        sleep(config.reveal_interval).await;
    }

    if !kind.needs_completion() {
        return;
    }
    sleep(config.reveal_interval).await;

    let completed = {
        let mut games = state.games.lock().await;
        let Some(game) = games.get_mut(&code) else {
            return;
        };
        match kind {
            RevealKind::Morning => game.complete_morning_reveal(),
            RevealKind::EndGameVotes => game.complete_end_game_vote_reveal(),
            RevealKind::Roles => game.complete_role_reveal(),
            RevealKind::Votes => Ok(()),
        }
    };
    match completed {
        Ok(()) => {
            info!("Game {}: {:?} reveal complete", code, kind);
            state.broadcast_state(&code).await;
        }
        Err(e) => debug!("Game {}: {:?} reveal not completed: {}", code, kind, e),
    }
}

fn next_item(game: &mut Game, kind: RevealKind) -> Option<(serde_json::Value, bool)> {
    match kind {
        RevealKind::Morning => encode(game.next_morning_arrival()?),
        RevealKind::Votes => encode(game.next_vote_reveal()?),
        RevealKind::EndGameVotes => encode(game.next_end_game_vote_reveal()?),
        RevealKind::Roles => encode(game.next_role_reveal()?),
    }
}

fn encode<T: Serialize>(step: Revealed<T>) -> Option<(serde_json::Value, bool)> {
    let is_last = step.is_last;
    serde_json::to_value(&step).ok().map(|item| (item, is_last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        command::GameCommand, config::ServerConfig, game::GamePhase, role::Theme,
    };
    use crate::services::game_store::GameStore;
    use std::time::Duration;

    fn fast_state() -> AppState {
        let config = ServerConfig {
            reveal_interval: Duration::from_millis(1),
            reveal_initial_delay: Duration::from_millis(1),
            role_reveal_initial_delay: Duration::from_millis(1),
            ..ServerConfig::default()
        };
        AppState::with_store(GameStore::with_seed(21), config)
    }

    #[tokio::test]
    async fn morning_reveal_runs_to_completion() {
        let state = fast_state();
        let code = {
            let mut games = state.games.lock().await;
            let (code, host) = games.create("Host", "h", 1, Theme::default()).unwrap();
            let game = games.get_mut(&code).unwrap();
            for name in ["A", "B", "C", "D"] {
                game.add_player(name, name).unwrap();
            }
            game.apply(host, GameCommand::StartGame).unwrap();
            game.phase = GamePhase::Morning;
            game.apply(host, GameCommand::StartMorningReveal).unwrap();
            code
        };

        let mut events = state.get_or_create_game_channel(&code).await.subscribe();
        spawn(state.clone(), code.clone(), RevealKind::Morning)
            .await
            .unwrap();

        let mut revealed = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, GameEvent::Revealed { .. }) {
                revealed += 1;
            }
        }
        assert_eq!(revealed, 5);

        let games = state.games.lock().await;
        let game = games.get(&code).unwrap();
        assert_eq!(game.morning.cursor(), 5);
        assert!(game.morning.is_complete());
    }

    #[tokio::test]
    async fn stops_quietly_when_the_game_is_gone() {
        let state = fast_state();
        spawn(state.clone(), "ZZZZ".to_string(), RevealKind::Roles)
            .await
            .unwrap();
    }
}
