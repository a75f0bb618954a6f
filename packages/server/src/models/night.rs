use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::{
    error::GameError,
    game::{Game, GamePhase},
    player::{EliminationCause, PlayerId},
    role::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NightMode {
    #[default]
    Murder,
    Recruit,
    /// Mandated when a lone traitor still faces a full table.
    ForcedRecruit,
}

impl NightMode {
    pub fn is_recruit(self) -> bool {
        matches!(self, NightMode::Recruit | NightMode::ForcedRecruit)
    }
}

/// The two modes traitors may pick between when a choice is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NightModeChoice {
    Murder,
    Recruit,
}

impl FromStr for NightModeChoice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MURDER" => Ok(NightModeChoice::Murder),
            "RECRUIT" => Ok(NightModeChoice::Recruit),
            _ => Err(GameError::InvalidNightMode(s.to_string())),
        }
    }
}

impl From<NightModeChoice> for NightMode {
    fn from(choice: NightModeChoice) -> Self {
        match choice {
            NightModeChoice::Murder => NightMode::Murder,
            NightModeChoice::Recruit => NightMode::Recruit,
        }
    }
}

/// Recruitment availability for the coming night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecruitmentOffer {
    Forced,
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Victim {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct NightState {
    pub(crate) mode: NightMode,
    pub(crate) selections: BTreeMap<PlayerId, PlayerId>,
    pub(crate) lock_ins: BTreeSet<PlayerId>,
    pub(crate) choice_offered: bool,
    /// Set for the rest of the match once two or more traitors recruit together.
    pub(crate) group_recruit_used: bool,
    pub(crate) last_victim: Option<Victim>,
    pub(crate) recruited_this_round: bool,
}

impl NightState {
    fn begin(&mut self, mode: NightMode, choice_offered: bool) {
        self.mode = mode;
        self.choice_offered = choice_offered;
        self.selections.clear();
        self.lock_ins.clear();
        self.recruited_this_round = false;
    }

    pub fn mode(&self) -> NightMode {
        self.mode
    }

    pub fn selection(&self, traitor: PlayerId) -> Option<PlayerId> {
        self.selections.get(&traitor).copied()
    }

    pub fn is_locked_in(&self, traitor: PlayerId) -> bool {
        self.lock_ins.contains(&traitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NightResolution {
    Murdered { victim: PlayerId },
    Recruited { recruit: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockInOutcome {
    Waiting { locked_in: usize, needed: usize },
    Resolved { resolution: NightResolution },
}

impl Game {
    pub fn night(&self) -> &NightState {
        &self.night
    }

    /// Recruitment rules for the night that would start now.
    pub fn recruitment_offer(&self) -> Option<RecruitmentOffer> {
        let traitors = self.alive_traitors().count();
        if traitors == 1 && self.alive_count() >= 5 {
            Some(RecruitmentOffer::Forced)
        } else if traitors >= 2 && !self.night.group_recruit_used && self.traitor_just_banished {
            Some(RecruitmentOffer::Optional)
        } else {
            None
        }
    }

    pub(crate) fn begin_night(&mut self) {
        let (mode, choice_offered) = match self.recruitment_offer() {
            Some(RecruitmentOffer::Forced) => (NightMode::ForcedRecruit, false),
            Some(RecruitmentOffer::Optional) => (NightMode::Murder, true),
            None => (NightMode::Murder, false),
        };
        self.traitor_just_banished = false;
        self.night.begin(mode, choice_offered);
        self.morning.reset();
        self.phase = GamePhase::Night;
    }

    fn require_living_traitor(&self, actor: PlayerId) -> Result<(), GameError> {
        match self.player(actor) {
            Some(p) if p.is_alive() && p.is_traitor() => Ok(()),
            _ => Err(GameError::NotTraitor),
        }
    }

    pub fn set_night_mode(
        &mut self,
        actor: PlayerId,
        choice: NightModeChoice,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Night)?;
        self.require_living_traitor(actor)?;
        if !self.night.choice_offered {
            return Err(GameError::NightModeChoiceUnavailable);
        }

        let mode = NightMode::from(choice);
        if self.night.mode != mode {
            self.night.mode = mode;
            // agreement covers the action as well as the target
            self.night.lock_ins.clear();
        }
        Ok(())
    }

    pub fn traitor_select(&mut self, actor: PlayerId, target: PlayerId) -> Result<(), GameError> {
        self.require_phase(GamePhase::Night)?;
        self.require_living_traitor(actor)?;
        let target_player = self
            .player(target)
            .filter(|p| p.is_alive())
            .ok_or(GameError::InvalidTarget)?;
        if target_player.is_traitor() {
            return Err(GameError::CannotTargetOwnFaction);
        }

        self.night.selections.insert(actor, target);
        self.night.lock_ins.remove(&actor);
        Ok(())
    }

    /// The common target when every living traitor has picked the same player.
    pub fn agreed_target(&self) -> Option<PlayerId> {
        let traitors = self.alive_traitor_ids();
        let mut picks = traitors.iter().map(|id| self.night.selection(*id));
        let first = picks.next()??;
        picks.all(|pick| pick == Some(first)).then_some(first)
    }

    pub fn traitor_lock_in(&mut self, actor: PlayerId) -> Result<LockInOutcome, GameError> {
        self.require_phase(GamePhase::Night)?;
        self.require_living_traitor(actor)?;
        let target = self.agreed_target().ok_or(GameError::NotAllAgreed)?;

        self.night.lock_ins.insert(actor);

        let traitors = self.alive_traitor_ids();
        let locked_in = traitors
            .iter()
            .filter(|id| self.night.is_locked_in(**id))
            .count();
        if locked_in < traitors.len() {
            return Ok(LockInOutcome::Waiting {
                locked_in,
                needed: traitors.len(),
            });
        }

        let resolution = self.resolve_night(target, traitors.len());
        Ok(LockInOutcome::Resolved { resolution })
    }

    fn resolve_night(&mut self, target: PlayerId, acting_traitors: usize) -> NightResolution {
        let mode = self.night.mode;
        let mut victim = None;
        if let Some(player) = self.player_mut(target) {
            if mode.is_recruit() {
                player.role = Some(Role::Traitor);
            } else {
                player.eliminate(EliminationCause::Murder);
                victim = Some(Victim {
                    id: player.id,
                    name: player.name.clone(),
                });
            }
        }

        self.phase = GamePhase::Morning;
        if mode.is_recruit() {
            self.night.recruited_this_round = true;
            self.night.last_victim = None;
            if acting_traitors >= 2 {
                self.night.group_recruit_used = true;
            }
            NightResolution::Recruited { recruit: target }
        } else {
            self.night.last_victim = victim;
            NightResolution::Murdered { victim: target }
        }
    }
}
