use rand::{rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    endgame::EndGameVoteState,
    error::GameError,
    night::NightState,
    player::{Player, PlayerId},
    reveal::{RevealSequence, Revealed},
    role::{Role, Theme, Winner},
    vote::VoteState,
};

pub const MIN_PLAYERS: usize = 4;
pub const MAX_PLAYERS: usize = 20;
pub const MAX_TRAITORS: usize = 8;
pub const MAX_NAME_LEN: usize = 32;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    RoleReveal,
    Night,
    Morning,
    RoundTable,
    Voting,
    VoteReveal,
    RunoffVoting,
    RunoffReveal,
    Banishment,
    EndGameVote,
    EndGameVoteReveal,
    GameOver,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Lobby => "LOBBY",
            GamePhase::RoleReveal => "ROLE_REVEAL",
            GamePhase::Night => "NIGHT",
            GamePhase::Morning => "MORNING",
            GamePhase::RoundTable => "ROUND_TABLE",
            GamePhase::Voting => "VOTING",
            GamePhase::VoteReveal => "VOTE_REVEAL",
            GamePhase::RunoffVoting => "RUNOFF_VOTING",
            GamePhase::RunoffReveal => "RUNOFF_REVEAL",
            GamePhase::Banishment => "BANISHMENT",
            GamePhase::EndGameVote => "END_GAME_VOTE",
            GamePhase::EndGameVoteReveal => "END_GAME_VOTE_REVEAL",
            GamePhase::GameOver => "GAME_OVER",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a player who left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Lobby departure: the seat is gone.
    Removed { now_empty: bool },
    /// Match in progress: the seat is kept for a rejoin.
    Disconnected,
}

/// A player walking into breakfast during the morning reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arrival {
    pub player_id: PlayerId,
    pub name: String,
}

/// One running match.
///
/// Every mutating method validates its preconditions before touching any state, so
/// a rejected call leaves the game exactly as it was.
#[derive(Debug, Clone)]
pub struct Game {
    pub(crate) code: String,
    pub(crate) phase: GamePhase,
    pub(crate) num_traitors: usize,
    pub(crate) theme: Theme,
    pub(crate) round: u32,
    pub(crate) end_game_mode: bool,
    pub(crate) winner: Option<Winner>,
    pub(crate) players: Vec<Player>,
    next_player_id: PlayerId,
    pub(crate) night: NightState,
    pub(crate) morning: RevealSequence,
    pub(crate) ballot: VoteState,
    pub(crate) end_game: EndGameVoteState,
    pub(crate) game_over_reveal: RevealSequence,
    pub(crate) survivors: Vec<PlayerId>,
    pub(crate) traitor_just_banished: bool,
    pub(crate) rng: StdRng,
}

impl Game {
    pub fn new(
        code: impl Into<String>,
        host_name: &str,
        host_session: impl Into<String>,
        num_traitors: usize,
        theme: Theme,
        rng: StdRng,
    ) -> Result<Self, GameError> {
        if !(1..=MAX_TRAITORS).contains(&num_traitors) {
            return Err(GameError::InvalidTraitorCount(MAX_TRAITORS));
        }
        let host_name = validate_name(host_name)?;

        let mut host = Player::new(1, host_name, host_session.into());
        host.is_host = true;

        Ok(Game {
            code: code.into(),
            phase: GamePhase::Lobby,
            num_traitors,
            theme,
            round: 0,
            end_game_mode: false,
            winner: None,
            players: vec![host],
            next_player_id: 2,
            night: NightState::default(),
            morning: RevealSequence::default(),
            ballot: VoteState::default(),
            end_game: EndGameVoteState::default(),
            game_over_reveal: RevealSequence::default(),
            survivors: Vec::new(),
            traitor_just_banished: false,
            rng,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn num_traitors(&self) -> usize {
        self.num_traitors
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn is_end_game_mode(&self) -> bool {
        self.end_game_mode
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_by_session(&self, session_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.session_id == session_id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.has_name(name))
    }

    /// The host is whichever record carries the host flag; its session token is the
    /// current address of the host.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.player(id).is_some_and(|p| p.is_host)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    pub fn alive_traitors(&self) -> impl Iterator<Item = &Player> {
        self.alive_players().filter(|p| p.is_traitor())
    }

    pub fn alive_traitor_ids(&self) -> Vec<PlayerId> {
        self.alive_traitors().map(|p| p.id).collect()
    }

    pub fn alive_faithful(&self) -> impl Iterator<Item = &Player> {
        self.alive_players()
            .filter(|p| p.role == Some(Role::Faithful))
    }

    pub(crate) fn require_host(&self, actor: PlayerId) -> Result<(), GameError> {
        match self.player(actor) {
            None => Err(GameError::PlayerNotFound),
            Some(p) if !p.is_host => Err(GameError::NotHost),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn require_phase(&self, phase: GamePhase) -> Result<(), GameError> {
        if self.phase != phase {
            return Err(GameError::WrongPhase(self.phase));
        }
        Ok(())
    }

    // ---- roster ----

    pub fn add_player(
        &mut self,
        name: &str,
        session_id: impl Into<String>,
    ) -> Result<PlayerId, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::Full(MAX_PLAYERS));
        }
        let name = validate_name(name)?;
        if self.player_by_name(&name).is_some() {
            return Err(GameError::NameTaken);
        }

        let id = self.next_player_id;
        self.next_player_id += 1;
        self.players.push(Player::new(id, name, session_id.into()));
        Ok(id)
    }

    /// Lobby departures delete the seat; later departures only flag it.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Departure, GameError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound)?;

        if self.phase != GamePhase::Lobby {
            self.players[index].disconnected = true;
            return Ok(Departure::Disconnected);
        }

        let removed = self.players.remove(index);
        if removed.is_host {
            if let Some(next_host) = self.players.first_mut() {
                next_host.is_host = true;
            }
        }
        Ok(Departure::Removed {
            now_empty: self.players.is_empty(),
        })
    }

    /// Re-binds an existing seat to a new session. Nothing else changes.
    pub fn rejoin(
        &mut self,
        name: &str,
        session_id: impl Into<String>,
    ) -> Result<PlayerId, GameError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.has_name(name))
            .ok_or(GameError::PlayerNotFound)?;
        player.session_id = session_id.into();
        player.disconnected = false;
        Ok(player.id)
    }

    // ---- setup ----

    pub fn start_game(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        if self.phase != GamePhase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers(MIN_PLAYERS));
        }
        if self.num_traitors >= self.players.len() {
            return Err(GameError::TooManyTraitors);
        }
        if self.num_traitors < 1 {
            return Err(GameError::InvalidTraitorCount(MAX_TRAITORS));
        }

        let mut seats: Vec<usize> = (0..self.players.len()).collect();
        seats.shuffle(&mut self.rng);
        for (rank, seat) in seats.into_iter().enumerate() {
            self.players[seat].role = Some(if rank < self.num_traitors {
                Role::Traitor
            } else {
                Role::Faithful
            });
        }

        self.phase = GamePhase::RoleReveal;
        self.round = 1;
        Ok(())
    }

    pub fn proceed_to_first_night(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::RoleReveal)?;
        self.begin_night();
        Ok(())
    }

    // ---- morning ----

    pub fn start_morning_reveal(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::Morning)?;
        if self.morning.is_started() {
            return Err(GameError::RevealAlreadyStarted);
        }

        let mut order: Vec<PlayerId> = self.alive_players().map(|p| p.id).collect();
        order.shuffle(&mut self.rng);
        self.morning.start(order);
        Ok(())
    }

    pub fn next_morning_arrival(&mut self) -> Option<Revealed<Arrival>> {
        if self.phase != GamePhase::Morning {
            return None;
        }
        let (player_id, is_last) = self.morning.advance()?;
        Some(Revealed {
            item: Arrival {
                player_id,
                name: self.display_name(player_id),
            },
            is_last,
        })
    }

    /// Unlocks the night's outcome for every observer.
    pub fn complete_morning_reveal(&mut self) -> Result<(), GameError> {
        self.require_phase(GamePhase::Morning)?;
        if !self.morning.mark_complete() {
            return Err(GameError::RevealIncomplete);
        }
        Ok(())
    }

    pub fn proceed_to_round_table(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::Morning)?;
        if !self.morning.is_complete() {
            return Err(GameError::RevealIncomplete);
        }
        self.phase = GamePhase::RoundTable;
        self.round += 1;
        Ok(())
    }

    pub(crate) fn display_name(&self, id: PlayerId) -> String {
        self.player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "?".to_string())
    }
}

fn validate_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidName);
    }
    Ok(name.to_string())
}
