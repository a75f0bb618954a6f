use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::{
    error::GameError,
    game::{Game, GamePhase},
    player::{EliminationCause, PlayerId},
    reveal::{RevealSequence, Revealed},
    role::{Role, Winner},
    vote::{VoteProgress, VoteState},
};

/// Alive headcount at or below which the host may call the end game.
pub const END_GAME_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndGameChoice {
    End,
    Banish,
}

impl FromStr for EndGameChoice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "END" => Ok(EndGameChoice::End),
            "BANISH" => Ok(EndGameChoice::Banish),
            _ => Err(GameError::InvalidChoice(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EndGameVoteState {
    pub(crate) votes: BTreeMap<PlayerId, EndGameChoice>,
    pub(crate) reveal: RevealSequence,
}

impl EndGameVoteState {
    pub fn votes(&self) -> &BTreeMap<PlayerId, EndGameChoice> {
        &self.votes
    }

    pub fn reveal(&self) -> &RevealSequence {
        &self.reveal
    }

    pub fn is_unanimous_end(&self) -> bool {
        !self.votes.is_empty() && self.votes.values().all(|c| *c == EndGameChoice::End)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndGameVoteRecord {
    pub player_id: PlayerId,
    pub name: String,
    pub choice: EndGameChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndGameVoteOutcome {
    GameOver { winner: Winner },
    Continue,
}

/// A role shown during the game-over reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCard {
    pub player_id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub eliminated_by: Option<EliminationCause>,
}

impl Game {
    pub fn end_game_votes(&self) -> &EndGameVoteState {
        &self.end_game
    }

    pub fn can_trigger_end_game(&self) -> bool {
        !self.end_game_mode
            && self.phase == GamePhase::RoundTable
            && self.alive_count() <= END_GAME_THRESHOLD
    }

    pub fn trigger_end_game(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::RoundTable)?;
        if !self.can_trigger_end_game() {
            return Err(GameError::EndGameUnavailable);
        }
        self.end_game_mode = true;
        self.open_end_game_vote();
        Ok(())
    }

    pub(crate) fn open_end_game_vote(&mut self) {
        self.end_game = EndGameVoteState::default();
        self.phase = GamePhase::EndGameVote;
    }

    pub fn cast_end_game_vote(
        &mut self,
        voter: PlayerId,
        choice: EndGameChoice,
    ) -> Result<VoteProgress, GameError> {
        self.require_phase(GamePhase::EndGameVote)?;
        if !self.player(voter).is_some_and(|p| p.is_alive()) {
            return Err(GameError::InvalidVoter);
        }
        self.end_game.votes.insert(voter, choice);
        Ok(VoteProgress::new(self.end_game.votes.len(), self.alive_count()))
    }

    pub fn all_end_game_votes_in(&self) -> bool {
        self.end_game.votes.len() == self.alive_count()
    }

    pub fn reveal_end_game_votes(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::EndGameVote)?;
        if !self.all_end_game_votes_in() {
            return Err(GameError::VotesOutstanding);
        }

        let mut order: Vec<PlayerId> = self.alive_players().map(|p| p.id).collect();
        order.shuffle(&mut self.rng);
        self.end_game.reveal.start(order);
        self.phase = GamePhase::EndGameVoteReveal;
        Ok(())
    }

    fn end_game_record(&self, id: PlayerId) -> Option<EndGameVoteRecord> {
        let choice = *self.end_game.votes.get(&id)?;
        Some(EndGameVoteRecord {
            player_id: id,
            name: self.display_name(id),
            choice,
        })
    }

    pub fn next_end_game_vote_reveal(&mut self) -> Option<Revealed<EndGameVoteRecord>> {
        if self.phase != GamePhase::EndGameVoteReveal {
            return None;
        }
        let (id, is_last) = self.end_game.reveal.advance()?;
        let item = self.end_game_record(id)?;
        Some(Revealed { item, is_last })
    }

    pub fn revealed_end_game_votes(&self) -> Vec<EndGameVoteRecord> {
        if self.phase != GamePhase::EndGameVoteReveal {
            return Vec::new();
        }
        self.end_game
            .reveal
            .revealed()
            .iter()
            .filter_map(|id| self.end_game_record(*id))
            .collect()
    }

    pub fn complete_end_game_vote_reveal(&mut self) -> Result<(), GameError> {
        self.require_phase(GamePhase::EndGameVoteReveal)?;
        if !self.end_game.reveal.mark_complete() {
            return Err(GameError::RevealIncomplete);
        }
        Ok(())
    }

    pub fn resolve_end_game_vote(&mut self, actor: PlayerId) -> Result<EndGameVoteOutcome, GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::EndGameVoteReveal)?;
        if !self.end_game.reveal.is_complete() {
            return Err(GameError::RevealIncomplete);
        }

        if self.end_game.is_unanimous_end() {
            let winner = self.resolve_end_game();
            return Ok(EndGameVoteOutcome::GameOver { winner });
        }

        self.ballot = VoteState::default();
        self.end_game = EndGameVoteState::default();
        self.phase = GamePhase::RoundTable;
        Ok(EndGameVoteOutcome::Continue)
    }

    /// Ends the match on the end-game rule: any surviving traitor wins it for the traitors.
    pub(crate) fn resolve_end_game(&mut self) -> Winner {
        let winner = if self.alive_traitors().next().is_some() {
            Winner::Traitors
        } else {
            Winner::Faithful
        };
        self.finish(winner);
        winner
    }

    /// Moves to GAME_OVER. Faithful roles are revealed first, traitors last.
    pub(crate) fn finish(&mut self, winner: Winner) {
        self.winner = Some(winner);
        self.survivors = self.alive_players().map(|p| p.id).collect();

        let ids = |traitor: bool| -> Vec<PlayerId> {
            self.players
                .iter()
                .filter(|p| p.is_traitor() == traitor)
                .map(|p| p.id)
                .collect()
        };
        let mut faithful = ids(false);
        let mut traitors = ids(true);
        faithful.shuffle(&mut self.rng);
        traitors.shuffle(&mut self.rng);
        faithful.extend(traitors);

        self.game_over_reveal.start(faithful);
        self.phase = GamePhase::GameOver;
    }

    fn role_card(&self, id: PlayerId) -> Option<RoleCard> {
        let p = self.player(id)?;
        Some(RoleCard {
            player_id: p.id,
            name: p.name.clone(),
            role: p.role,
            alive: p.is_alive(),
            eliminated_by: p.eliminated_by,
        })
    }

    pub fn game_over_reveal(&self) -> &RevealSequence {
        &self.game_over_reveal
    }

    pub fn next_role_reveal(&mut self) -> Option<Revealed<RoleCard>> {
        if self.phase != GamePhase::GameOver {
            return None;
        }
        let (id, is_last) = self.game_over_reveal.advance()?;
        let item = self.role_card(id)?;
        Some(Revealed { item, is_last })
    }

    pub fn revealed_roles(&self) -> Vec<RoleCard> {
        self.game_over_reveal
            .revealed()
            .iter()
            .filter_map(|id| self.role_card(*id))
            .collect()
    }

    pub fn survivors(&self) -> &[PlayerId] {
        &self.survivors
    }

    pub fn complete_role_reveal(&mut self) -> Result<(), GameError> {
        self.require_phase(GamePhase::GameOver)?;
        if !self.game_over_reveal.mark_complete() {
            return Err(GameError::RevealIncomplete);
        }
        Ok(())
    }
}
