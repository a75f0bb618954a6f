use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{
    error::GameError,
    game::{Game, GamePhase},
    night::RecruitmentOffer,
    player::{EliminationCause, PlayerId},
    reveal::{RevealSequence, Revealed},
    role::Winner,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteProgress {
    pub cast: usize,
    pub total: usize,
    pub all_voted: bool,
}

impl VoteProgress {
    pub(crate) fn new(cast: usize, total: usize) -> Self {
        Self {
            cast,
            total,
            all_voted: cast >= total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub voter_id: PlayerId,
    pub voter_name: String,
    pub target_id: PlayerId,
    pub target_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub id: PlayerId,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteResolution {
    Banish { target: PlayerId },
    /// Primary vote tied; runoff voting is now open between the candidates.
    Runoff { candidates: Vec<PlayerId> },
    /// Runoff tied again; the host has to pick one of the candidates.
    StillTied { candidates: Vec<PlayerId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "next", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AfterBanishment {
    GameOver { winner: Winner },
    Night { recruitment: Option<RecruitmentOffer> },
    EndGameVote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanishmentOutcome {
    pub banished: PlayerId,
    pub was_traitor: bool,
    pub then: AfterBanishment,
}

/// Ballots for the day. Primary and runoff share one reveal sequence because only one
/// of them is ever being revealed.
#[derive(Debug, Clone, Default)]
pub struct VoteState {
    pub(crate) votes: BTreeMap<PlayerId, PlayerId>,
    pub(crate) runoff_votes: BTreeMap<PlayerId, PlayerId>,
    pub(crate) runoff_candidates: Vec<PlayerId>,
    pub(crate) reveal: RevealSequence,
    pub(crate) pending_banishment: Option<PlayerId>,
    pub(crate) unresolved_tie: Vec<PlayerId>,
}

impl VoteState {
    pub fn votes(&self, runoff: bool) -> &BTreeMap<PlayerId, PlayerId> {
        if runoff {
            &self.runoff_votes
        } else {
            &self.votes
        }
    }

    pub fn runoff_candidates(&self) -> &[PlayerId] {
        &self.runoff_candidates
    }

    pub fn reveal(&self) -> &RevealSequence {
        &self.reveal
    }

    pub fn pending_banishment(&self) -> Option<PlayerId> {
        self.pending_banishment
    }

    pub fn unresolved_tie(&self) -> &[PlayerId] {
        &self.unresolved_tie
    }
}

/// Every target sharing the highest vote count, in ascending id order.
pub fn leading_targets(votes: &BTreeMap<PlayerId, PlayerId>) -> Vec<PlayerId> {
    let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for target in votes.values() {
        *counts.entry(*target).or_insert(0) += 1;
    }
    let Some(max) = counts.values().copied().max() else {
        return Vec::new();
    };
    counts
        .into_iter()
        .filter(|(_, count)| *count == max)
        .map(|(id, _)| id)
        .collect()
}

impl Game {
    pub fn ballot(&self) -> &VoteState {
        &self.ballot
    }

    pub fn open_voting(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::RoundTable)?;
        self.ballot = VoteState::default();
        self.phase = GamePhase::Voting;
        Ok(())
    }

    fn require_voter(&self, voter: PlayerId) -> Result<(), GameError> {
        match self.player(voter) {
            Some(p) if p.is_alive() => Ok(()),
            _ => Err(GameError::InvalidVoter),
        }
    }

    pub fn cast_vote(&mut self, voter: PlayerId, target: PlayerId) -> Result<VoteProgress, GameError> {
        if self.phase != GamePhase::Voting {
            return Err(GameError::VotingNotOpen);
        }
        self.require_voter(voter)?;
        if !self.player(target).is_some_and(|p| p.is_alive()) {
            return Err(GameError::InvalidTarget);
        }
        if voter == target {
            return Err(GameError::SelfVote);
        }

        self.ballot.votes.insert(voter, target);
        Ok(VoteProgress::new(self.ballot.votes.len(), self.alive_count()))
    }

    pub fn cast_runoff_vote(
        &mut self,
        voter: PlayerId,
        target: PlayerId,
    ) -> Result<VoteProgress, GameError> {
        if self.phase != GamePhase::RunoffVoting {
            return Err(GameError::VotingNotOpen);
        }
        self.require_voter(voter)?;
        if !self.ballot.runoff_candidates.contains(&target) {
            return Err(GameError::NotRunoffCandidate);
        }
        if voter == target {
            return Err(GameError::SelfVote);
        }

        self.ballot.runoff_votes.insert(voter, target);
        Ok(VoteProgress::new(
            self.ballot.runoff_votes.len(),
            self.alive_count(),
        ))
    }

    pub fn all_votes_in(&self) -> bool {
        self.ballot.votes.len() == self.alive_count()
    }

    pub fn all_runoff_votes_in(&self) -> bool {
        self.ballot.runoff_votes.len() == self.alive_count()
    }

    pub fn reveal_votes(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::Voting)?;
        if !self.all_votes_in() {
            return Err(GameError::VotesOutstanding);
        }
        self.start_vote_reveal(false);
        Ok(())
    }

    pub fn reveal_runoff_votes(&mut self, actor: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::RunoffVoting)?;
        if !self.all_runoff_votes_in() {
            return Err(GameError::VotesOutstanding);
        }
        self.start_vote_reveal(true);
        Ok(())
    }

    fn start_vote_reveal(&mut self, runoff: bool) {
        let mut order: Vec<PlayerId> = self.ballot.votes(runoff).keys().copied().collect();
        order.shuffle(&mut self.rng);
        self.ballot.reveal.start(order);
        self.phase = if runoff {
            GamePhase::RunoffReveal
        } else {
            GamePhase::VoteReveal
        };
    }

    fn revealing_runoff(&self) -> Option<bool> {
        match self.phase {
            GamePhase::VoteReveal => Some(false),
            GamePhase::RunoffReveal => Some(true),
            _ => None,
        }
    }

    fn vote_record(&self, voter: PlayerId, runoff: bool) -> Option<VoteRecord> {
        let target = *self.ballot.votes(runoff).get(&voter)?;
        Some(VoteRecord {
            voter_id: voter,
            voter_name: self.display_name(voter),
            target_id: target,
            target_name: self.display_name(target),
        })
    }

    pub fn next_vote_reveal(&mut self) -> Option<Revealed<VoteRecord>> {
        let runoff = self.revealing_runoff()?;
        let (voter, is_last) = self.ballot.reveal.advance()?;
        let item = self.vote_record(voter, runoff)?;
        Some(Revealed { item, is_last })
    }

    /// Votes shown so far in the current reveal.
    pub fn revealed_votes(&self) -> Vec<VoteRecord> {
        let Some(runoff) = self.revealing_runoff() else {
            return Vec::new();
        };
        self.ballot
            .reveal
            .revealed()
            .iter()
            .filter_map(|voter| self.vote_record(*voter, runoff))
            .collect()
    }

    /// Running tallies built only from votes already revealed.
    pub fn revealed_tallies(&self) -> Vec<TallyEntry> {
        let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
        for record in self.revealed_votes() {
            *counts.entry(record.target_id).or_insert(0) += 1;
        }
        let mut tallies: Vec<TallyEntry> = counts
            .into_iter()
            .map(|(id, count)| TallyEntry {
                id,
                name: self.display_name(id),
                count,
            })
            .collect();
        tallies.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
        tallies
    }

    pub fn resolve_votes(&mut self, actor: PlayerId) -> Result<VoteResolution, GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::VoteReveal)?;
        if !self.ballot.reveal.is_exhausted() {
            return Err(GameError::RevealIncomplete);
        }

        let leading = leading_targets(&self.ballot.votes);
        match leading.as_slice() {
            [] => Err(GameError::VotesOutstanding),
            [target] => {
                self.set_pending_banishment(*target);
                Ok(VoteResolution::Banish { target: *target })
            }
            _ => {
                self.ballot.runoff_candidates = leading.clone();
                self.ballot.runoff_votes.clear();
                self.ballot.reveal.reset();
                self.phase = GamePhase::RunoffVoting;
                Ok(VoteResolution::Runoff {
                    candidates: leading,
                })
            }
        }
    }

    pub fn resolve_runoff(&mut self, actor: PlayerId) -> Result<VoteResolution, GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::RunoffReveal)?;
        if !self.ballot.reveal.is_exhausted() {
            return Err(GameError::RevealIncomplete);
        }

        let leading = leading_targets(&self.ballot.runoff_votes);
        match leading.as_slice() {
            [] => Err(GameError::VotesOutstanding),
            [target] => {
                self.set_pending_banishment(*target);
                Ok(VoteResolution::Banish { target: *target })
            }
            _ => {
                self.ballot.unresolved_tie = leading.clone();
                Ok(VoteResolution::StillTied {
                    candidates: leading,
                })
            }
        }
    }

    pub fn break_tie(&mut self, actor: PlayerId, target: PlayerId) -> Result<(), GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::RunoffReveal)?;
        if self.ballot.unresolved_tie.is_empty() {
            return Err(GameError::NoTieToBreak);
        }
        if !self.ballot.unresolved_tie.contains(&target) {
            return Err(GameError::NotRunoffCandidate);
        }
        self.set_pending_banishment(target);
        Ok(())
    }

    fn set_pending_banishment(&mut self, target: PlayerId) {
        self.ballot.pending_banishment = Some(target);
        self.ballot.unresolved_tie.clear();
        self.phase = GamePhase::Banishment;
    }

    pub fn execute_banishment(&mut self, actor: PlayerId) -> Result<BanishmentOutcome, GameError> {
        self.require_host(actor)?;
        self.require_phase(GamePhase::Banishment)?;
        let banished = self
            .ballot
            .pending_banishment
            .ok_or(GameError::PlayerNotFound)?;
        let player = self
            .player_mut(banished)
            .ok_or(GameError::PlayerNotFound)?;

        player.eliminate(EliminationCause::Banishment);
        let was_traitor = player.is_traitor();
        if was_traitor {
            self.traitor_just_banished = true;
        }
        self.ballot.pending_banishment = None;

        let then = if self.alive_traitors().next().is_none() {
            self.finish(Winner::Faithful);
            AfterBanishment::GameOver {
                winner: Winner::Faithful,
            }
        } else if self.alive_faithful().next().is_none() || self.alive_count() <= 2 {
            AfterBanishment::GameOver {
                winner: self.resolve_end_game(),
            }
        } else if self.end_game_mode {
            self.open_end_game_vote();
            AfterBanishment::EndGameVote
        } else {
            let recruitment = self.recruitment_offer();
            self.begin_night();
            AfterBanishment::Night { recruitment }
        };

        Ok(BanishmentOutcome {
            banished,
            was_traitor,
            then,
        })
    }
}
