use serde::Serialize;

use super::{
    endgame::{EndGameChoice, EndGameVoteRecord, RoleCard},
    game::{Arrival, Game, GamePhase},
    night::{NightMode, Victim},
    player::{EliminationCause, Player, PlayerId},
    role::{Role, Theme, Winner},
    vote::{TallyEntry, VoteRecord},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub eliminated_by: Option<EliminationCause>,
    pub is_host: bool,
    pub is_me: bool,
    pub disconnected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeView {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub is_host: bool,
}

/// Affordances shown only to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostControls {
    pub num_traitors: usize,
    pub can_start: bool,
    pub can_proceed_to_night: bool,
    pub can_start_morning_reveal: bool,
    pub can_proceed_to_round_table: bool,
    pub can_open_voting: bool,
    pub can_trigger_end_game: bool,
    pub can_reveal_votes: bool,
    pub can_resolve_votes: bool,
    pub can_break_tie: bool,
    pub can_execute_banishment: bool,
    pub can_reveal_end_game_votes: bool,
    pub can_resolve_end_game_vote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitorSelection {
    pub id: PlayerId,
    pub name: String,
    pub is_me: bool,
    pub selected_target_id: Option<PlayerId>,
    pub locked_in: bool,
}

/// What living traitors see at night. Everyone else gets nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitorNight {
    pub mode: NightMode,
    pub can_choose_mode: bool,
    pub targets: Vec<PlayerSummary>,
    pub selections: Vec<TraitorSelection>,
    pub all_same_target: bool,
    pub my_selection: Option<PlayerId>,
    pub my_locked_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MorningOutcome {
    pub victim: Option<Victim>,
    pub recruited_this_round: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallotView<T> {
    pub my_vote: Option<T>,
    pub vote_count: usize,
    pub total_voters: usize,
    pub all_voted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseView {
    Lobby,
    RoleReveal {
        traitors: Option<Vec<PlayerSummary>>,
    },
    Night {
        traitor: Option<TraitorNight>,
    },
    Morning {
        started: bool,
        complete: bool,
        total: usize,
        arrivals: Vec<Arrival>,
        outcome: Option<MorningOutcome>,
        traitors: Option<Vec<PlayerSummary>>,
    },
    RoundTable,
    Voting {
        ballot: BallotView<PlayerId>,
    },
    RunoffVoting {
        candidates: Vec<PlayerSummary>,
        ballot: BallotView<PlayerId>,
    },
    VoteReveal {
        is_runoff: bool,
        revealed: Vec<VoteRecord>,
        tallies: Vec<TallyEntry>,
        reveal_complete: bool,
        tied_candidates: Vec<PlayerSummary>,
    },
    Banishment {
        id: PlayerId,
        name: String,
        role: Option<Role>,
    },
    EndGameVote {
        ballot: BallotView<EndGameChoice>,
    },
    EndGameVoteReveal {
        revealed: Vec<EndGameVoteRecord>,
        complete: bool,
        results: Option<Vec<EndGameVoteRecord>>,
    },
    GameOver {
        winner: Option<Winner>,
        roles: Vec<RoleCard>,
        complete: bool,
        survivors: Option<Vec<PlayerSummary>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub code: String,
    pub phase: GamePhase,
    pub round: u32,
    pub theme: Theme,
    pub me: MeView,
    pub is_end_game_mode: bool,
    pub can_trigger_end_game: bool,
    pub alive_players: Vec<PlayerSummary>,
    pub all_players: Vec<RosterEntry>,
    pub lobby_players: Vec<PlayerSummary>,
    pub host: Option<HostControls>,
    pub details: PhaseView,
}

impl Game {
    /// Snapshot of the match as `observer` is allowed to see it.
    pub fn view_for(&self, observer: &Player) -> GameView {
        let summary = |p: &Player| PlayerSummary {
            id: p.id,
            name: p.name.clone(),
            is_host: p.is_host,
            is_me: p.id == observer.id,
        };

        // the night's victim still reads as alive until the morning reveal completes
        let hidden_victim = self.unrevealed_victim();
        let shown_alive = |p: &Player| p.is_alive() || Some(p.id) == hidden_victim;

        let lobby_players = if self.phase == GamePhase::Lobby {
            self.players.iter().map(summary).collect()
        } else {
            Vec::new()
        };

        GameView {
            code: self.code.clone(),
            phase: self.phase,
            round: self.round,
            theme: self.theme,
            me: MeView {
                id: observer.id,
                name: observer.name.clone(),
                role: observer.role,
                alive: shown_alive(observer),
                is_host: observer.is_host,
            },
            is_end_game_mode: self.end_game_mode,
            can_trigger_end_game: observer.is_host && self.can_trigger_end_game(),
            alive_players: self
                .players
                .iter()
                .filter(|p| shown_alive(*p))
                .map(summary)
                .collect(),
            all_players: self
                .players
                .iter()
                .map(|p| RosterEntry {
                    id: p.id,
                    name: p.name.clone(),
                    alive: shown_alive(p),
                    eliminated_by: p.eliminated_by.filter(|_| Some(p.id) != hidden_victim),
                    is_host: p.is_host,
                    is_me: p.id == observer.id,
                    disconnected: p.disconnected,
                })
                .collect(),
            lobby_players,
            host: observer.is_host.then(|| self.host_controls()),
            details: self.phase_view(observer),
        }
    }

    fn unrevealed_victim(&self) -> Option<PlayerId> {
        if self.phase != GamePhase::Morning || self.morning.is_complete() {
            return None;
        }
        self.night.last_victim.as_ref().map(|v| v.id)
    }

    fn summaries(&self, ids: &[PlayerId], observer: PlayerId) -> Vec<PlayerSummary> {
        ids.iter()
            .filter_map(|id| self.player(*id))
            .map(|p| PlayerSummary {
                id: p.id,
                name: p.name.clone(),
                is_host: p.is_host,
                is_me: p.id == observer,
            })
            .collect()
    }

    fn traitor_team(&self, observer: &Player) -> Option<Vec<PlayerSummary>> {
        observer
            .is_traitor()
            .then(|| self.summaries(&self.alive_traitor_ids(), observer.id))
    }

    fn host_controls(&self) -> HostControls {
        let phase = self.phase;
        HostControls {
            num_traitors: self.num_traitors,
            can_start: phase == GamePhase::Lobby && self.players.len() >= super::game::MIN_PLAYERS,
            can_proceed_to_night: phase == GamePhase::RoleReveal,
            can_start_morning_reveal: phase == GamePhase::Morning && !self.morning.is_started(),
            can_proceed_to_round_table: phase == GamePhase::Morning && self.morning.is_complete(),
            can_open_voting: phase == GamePhase::RoundTable,
            can_trigger_end_game: self.can_trigger_end_game(),
            can_reveal_votes: (phase == GamePhase::Voting && self.all_votes_in())
                || (phase == GamePhase::RunoffVoting && self.all_runoff_votes_in()),
            can_resolve_votes: matches!(phase, GamePhase::VoteReveal | GamePhase::RunoffReveal)
                && self.ballot.reveal.is_exhausted()
                && self.ballot.unresolved_tie.is_empty(),
            can_break_tie: phase == GamePhase::RunoffReveal
                && !self.ballot.unresolved_tie.is_empty(),
            can_execute_banishment: phase == GamePhase::Banishment,
            can_reveal_end_game_votes: phase == GamePhase::EndGameVote
                && self.all_end_game_votes_in(),
            can_resolve_end_game_vote: phase == GamePhase::EndGameVoteReveal
                && self.end_game.reveal.is_complete(),
        }
    }

    fn phase_view(&self, observer: &Player) -> PhaseView {
        match self.phase {
            GamePhase::Lobby => PhaseView::Lobby,
            GamePhase::RoleReveal => PhaseView::RoleReveal {
                traitors: self.traitor_team(observer),
            },
            GamePhase::Night => PhaseView::Night {
                traitor: (observer.is_alive() && observer.is_traitor())
                    .then(|| self.traitor_night(observer)),
            },
            GamePhase::Morning => {
                let complete = self.morning.is_complete();
                PhaseView::Morning {
                    started: self.morning.is_started(),
                    complete,
                    total: self.morning.len(),
                    arrivals: self
                        .morning
                        .revealed()
                        .iter()
                        .map(|id| Arrival {
                            player_id: *id,
                            name: self.display_name(*id),
                        })
                        .collect(),
                    outcome: complete.then(|| MorningOutcome {
                        victim: self.night.last_victim.clone(),
                        recruited_this_round: self.night.recruited_this_round,
                    }),
                    traitors: self.traitor_team(observer),
                }
            }
            GamePhase::RoundTable => PhaseView::RoundTable,
            GamePhase::Voting => PhaseView::Voting {
                ballot: self.ballot_view(self.ballot.votes(false), observer.id),
            },
            GamePhase::RunoffVoting => PhaseView::RunoffVoting {
                candidates: self.summaries(&self.ballot.runoff_candidates, observer.id),
                ballot: self.ballot_view(self.ballot.votes(true), observer.id),
            },
            GamePhase::VoteReveal | GamePhase::RunoffReveal => PhaseView::VoteReveal {
                is_runoff: self.phase == GamePhase::RunoffReveal,
                revealed: self.revealed_votes(),
                tallies: self.revealed_tallies(),
                reveal_complete: self.ballot.reveal.is_exhausted(),
                tied_candidates: self.summaries(&self.ballot.unresolved_tie, observer.id),
            },
            GamePhase::Banishment => {
                let banished = self
                    .ballot
                    .pending_banishment
                    .and_then(|id| self.player(id));
                PhaseView::Banishment {
                    id: banished.map(|p| p.id).unwrap_or_default(),
                    name: banished.map(|p| p.name.clone()).unwrap_or_default(),
                    role: banished.and_then(|p| p.role),
                }
            }
            GamePhase::EndGameVote => PhaseView::EndGameVote {
                ballot: self.ballot_view(&self.end_game.votes, observer.id),
            },
            GamePhase::EndGameVoteReveal => {
                let complete = self.end_game.reveal.is_complete();
                PhaseView::EndGameVoteReveal {
                    revealed: self.revealed_end_game_votes(),
                    complete,
                    results: complete.then(|| {
                        self.alive_players()
                            .filter_map(|p| {
                                let choice = *self.end_game.votes.get(&p.id)?;
                                Some(EndGameVoteRecord {
                                    player_id: p.id,
                                    name: p.name.clone(),
                                    choice,
                                })
                            })
                            .collect()
                    }),
                }
            }
            GamePhase::GameOver => {
                let complete = self.game_over_reveal.is_complete();
                PhaseView::GameOver {
                    winner: self.winner,
                    roles: self.revealed_roles(),
                    complete,
                    survivors: complete.then(|| self.summaries(&self.survivors, observer.id)),
                }
            }
        }
    }

    fn traitor_night(&self, observer: &Player) -> TraitorNight {
        let targets = self
            .alive_faithful()
            .map(|p| PlayerSummary {
                id: p.id,
                name: p.name.clone(),
                is_host: p.is_host,
                is_me: false,
            })
            .collect();
        let selections = self
            .alive_traitors()
            .map(|t| TraitorSelection {
                id: t.id,
                name: t.name.clone(),
                is_me: t.id == observer.id,
                selected_target_id: self.night.selection(t.id),
                locked_in: self.night.is_locked_in(t.id),
            })
            .collect();

        TraitorNight {
            mode: self.night.mode,
            can_choose_mode: self.night.choice_offered,
            targets,
            selections,
            all_same_target: self.agreed_target().is_some(),
            my_selection: self.night.selection(observer.id),
            my_locked_in: self.night.is_locked_in(observer.id),
        }
    }

    fn ballot_view<T: Copy>(
        &self,
        votes: &std::collections::BTreeMap<PlayerId, T>,
        observer: PlayerId,
    ) -> BallotView<T> {
        let total_voters = self.alive_count();
        BallotView {
            my_vote: votes.get(&observer).copied(),
            vote_count: votes.len(),
            total_voters,
            all_voted: votes.len() >= total_voters,
        }
    }
}
