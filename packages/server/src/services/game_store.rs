use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{
    error::GameError,
    game::{Game, GamePhase},
    player::PlayerId,
    role::Theme,
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 4;

#[derive(Debug)]
pub struct StoredGame {
    pub game: Game,
    pub last_activity: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StoredGame {
    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        if self.game.phase() == GamePhase::GameOver && self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, idle_ttl: Duration, finished_ttl: Duration) -> bool {
        let older_than = |since: DateTime<Utc>, ttl: Duration| {
            (now - since).to_std().is_ok_and(|elapsed| elapsed > ttl)
        };
        if self.game.phase() == GamePhase::GameOver {
            let finished = self.finished_at.unwrap_or(self.last_activity);
            if older_than(finished, finished_ttl) {
                return true;
            }
        }
        older_than(self.last_activity, idle_ttl)
    }
}

/// Every live game, keyed by join code.
///
/// Each game gets its own random source seeded from the store's, so a seeded store
/// replays the same codes and shuffles.
#[derive(Debug)]
pub struct GameStore {
    games: HashMap<String, StoredGame>,
    rng: StdRng,
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            games: HashMap::new(),
            rng,
        }
    }

    fn generate_code(&mut self) -> String {
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.games.contains_key(&code) {
                return code;
            }
        }
    }

    /// Opens a new lobby with the creator seated as host.
    pub fn create(
        &mut self,
        host_name: &str,
        host_session: &str,
        num_traitors: usize,
        theme: Theme,
    ) -> Result<(String, PlayerId), GameError> {
        let code = self.generate_code();
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let game = Game::new(code.clone(), host_name, host_session, num_traitors, theme, rng)?;
        let host_id = game.host().map(|p| p.id).ok_or(GameError::PlayerNotFound)?;

        self.games.insert(
            code.clone(),
            StoredGame {
                game,
                last_activity: Utc::now(),
                finished_at: None,
            },
        );
        Ok((code, host_id))
    }

    pub fn get(&self, code: &str) -> Option<&Game> {
        self.games.get(&normalize_code(code)).map(|s| &s.game)
    }

    /// Mutable access. Counts as activity for eviction.
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Game> {
        let stored = self.games.get_mut(&normalize_code(code))?;
        stored.touch(Utc::now());
        Some(&mut stored.game)
    }

    pub fn delete(&mut self, code: &str) -> bool {
        self.games.remove(&normalize_code(code)).is_some()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.games.contains_key(&normalize_code(code))
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn find_by_session(&self, session_id: &str) -> Option<(String, PlayerId)> {
        self.games.iter().find_map(|(code, stored)| {
            stored
                .game
                .player_by_session(session_id)
                .map(|p| (code.clone(), p.id))
        })
    }

    /// Drops finished games past `finished_ttl` and any game idle past `idle_ttl`.
    /// Returns the removed codes.
    pub fn reap(
        &mut self,
        now: DateTime<Utc>,
        idle_ttl: Duration,
        finished_ttl: Duration,
    ) -> Vec<String> {
        let expired: Vec<String> = self
            .games
            .iter()
            .filter(|(_, stored)| stored.is_expired(now, idle_ttl, finished_ttl))
            .map(|(code, _)| code.clone())
            .collect();
        for code in &expired {
            self.games.remove(code);
        }
        expired
    }

    #[cfg(test)]
    fn backdate(&mut self, code: &str, last_activity: DateTime<Utc>) {
        if let Some(stored) = self.games.get_mut(code) {
            stored.last_activity = last_activity;
        }
    }
}

/// Join codes are case-insensitive.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
