use serde::{Deserialize, Serialize};

use super::{
    endgame::{EndGameChoice, EndGameVoteOutcome},
    error::GameError,
    game::Game,
    night::{LockInOutcome, NightModeChoice},
    player::PlayerId,
    reveal::RevealKind,
    vote::{BanishmentOutcome, VoteProgress, VoteResolution},
};

/// A request from one player. String-typed choices are parsed before the game is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameCommand {
    StartGame,
    ProceedToFirstNight,
    StartMorningReveal,
    TraitorSelect { target_id: PlayerId },
    SetNightMode { mode: String },
    TraitorLockIn,
    ProceedToRoundTable,
    TriggerEndGame,
    OpenVoting,
    CastVote { target_id: PlayerId },
    RevealVotes,
    ResolveVotes,
    CastRunoffVote { target_id: PlayerId },
    RevealRunoffVotes,
    ResolveRunoff,
    BreakTie { target_id: PlayerId },
    ExecuteBanishment,
    CastEndGameVote { choice: String },
    RevealEndGameVotes,
    ResolveEndGameVote,
}

impl GameCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::StartGame => "start_game",
            GameCommand::ProceedToFirstNight => "proceed_to_first_night",
            GameCommand::StartMorningReveal => "start_morning_reveal",
            GameCommand::TraitorSelect { .. } => "traitor_select",
            GameCommand::SetNightMode { .. } => "set_night_mode",
            GameCommand::TraitorLockIn => "traitor_lock_in",
            GameCommand::ProceedToRoundTable => "proceed_to_round_table",
            GameCommand::TriggerEndGame => "trigger_end_game",
            GameCommand::OpenVoting => "open_voting",
            GameCommand::CastVote { .. } => "cast_vote",
            GameCommand::RevealVotes => "reveal_votes",
            GameCommand::ResolveVotes => "resolve_votes",
            GameCommand::CastRunoffVote { .. } => "cast_runoff_vote",
            GameCommand::RevealRunoffVotes => "reveal_runoff_votes",
            GameCommand::ResolveRunoff => "resolve_runoff",
            GameCommand::BreakTie { .. } => "break_tie",
            GameCommand::ExecuteBanishment => "execute_banishment",
            GameCommand::CastEndGameVote { .. } => "cast_end_game_vote",
            GameCommand::RevealEndGameVotes => "reveal_end_game_votes",
            GameCommand::ResolveEndGameVote => "resolve_end_game_vote",
        }
    }

    /// The drip reveal a successful command kicks off, if any.
    pub fn starts_reveal(&self) -> Option<RevealKind> {
        match self {
            GameCommand::StartMorningReveal => Some(RevealKind::Morning),
            GameCommand::RevealVotes | GameCommand::RevealRunoffVotes => Some(RevealKind::Votes),
            GameCommand::RevealEndGameVotes => Some(RevealKind::EndGameVotes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Done,
    VoteCast { progress: VoteProgress },
    LockIn { result: LockInOutcome },
    Votes { resolution: VoteResolution },
    Banishment { result: BanishmentOutcome },
    EndGameVote { result: EndGameVoteOutcome },
}

impl Game {
    pub fn apply(&mut self, actor: PlayerId, cmd: GameCommand) -> Result<CommandOutcome, GameError> {
        if self.player(actor).is_none() {
            return Err(GameError::NotInGame);
        }

        let done = CommandOutcome::Done;
        let outcome = match cmd {
            GameCommand::StartGame => self.start_game(actor).map(|()| done)?,
            GameCommand::ProceedToFirstNight => self.proceed_to_first_night(actor).map(|()| done)?,
            GameCommand::StartMorningReveal => self.start_morning_reveal(actor).map(|()| done)?,
            GameCommand::TraitorSelect { target_id } => {
                self.traitor_select(actor, target_id).map(|()| done)?
            }
            GameCommand::SetNightMode { mode } => {
                let choice: NightModeChoice = mode.parse()?;
                self.set_night_mode(actor, choice).map(|()| done)?
            }
            GameCommand::TraitorLockIn => CommandOutcome::LockIn {
                result: self.traitor_lock_in(actor)?,
            },
            GameCommand::ProceedToRoundTable => self.proceed_to_round_table(actor).map(|()| done)?,
            GameCommand::TriggerEndGame => self.trigger_end_game(actor).map(|()| done)?,
            GameCommand::OpenVoting => self.open_voting(actor).map(|()| done)?,
            GameCommand::CastVote { target_id } => CommandOutcome::VoteCast {
                progress: self.cast_vote(actor, target_id)?,
            },
            GameCommand::RevealVotes => self.reveal_votes(actor).map(|()| done)?,
            GameCommand::ResolveVotes => CommandOutcome::Votes {
                resolution: self.resolve_votes(actor)?,
            },
            GameCommand::CastRunoffVote { target_id } => CommandOutcome::VoteCast {
                progress: self.cast_runoff_vote(actor, target_id)?,
            },
            GameCommand::RevealRunoffVotes => self.reveal_runoff_votes(actor).map(|()| done)?,
            GameCommand::ResolveRunoff => CommandOutcome::Votes {
                resolution: self.resolve_runoff(actor)?,
            },
            GameCommand::BreakTie { target_id } => self.break_tie(actor, target_id).map(|()| done)?,
            GameCommand::ExecuteBanishment => CommandOutcome::Banishment {
                result: self.execute_banishment(actor)?,
            },
            GameCommand::CastEndGameVote { choice } => {
                let choice: EndGameChoice = choice.parse()?;
                CommandOutcome::VoteCast {
                    progress: self.cast_end_game_vote(actor, choice)?,
                }
            }
            GameCommand::RevealEndGameVotes => self.reveal_end_game_votes(actor).map(|()| done)?,
            GameCommand::ResolveEndGameVote => CommandOutcome::EndGameVote {
                result: self.resolve_end_game_vote(actor)?,
            },
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{game::GamePhase, role::Theme};
    use rand::{rngs::StdRng, SeedableRng};

    fn lobby() -> Game {
        let mut game =
            Game::new("CMDS", "Host", "h", 1, Theme::default(), StdRng::seed_from_u64(5)).unwrap();
        for name in ["Ann", "Ben", "Cat"] {
            game.add_player(name, name.to_lowercase()).unwrap();
        }
        game
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let cmd: GameCommand =
            serde_json::from_str(r#"{"action":"cast_vote","target_id":3}"#).unwrap();
        assert_eq!(cmd, GameCommand::CastVote { target_id: 3 });

        let cmd: GameCommand = serde_json::from_str(r#"{"action":"start_game"}"#).unwrap();
        assert_eq!(cmd, GameCommand::StartGame);
        assert_eq!(cmd.name(), "start_game");

        assert!(serde_json::from_str::<GameCommand>(r#"{"action":"fly"}"#).is_err());
    }

    #[test]
    fn strangers_are_rejected_first() {
        let mut game = lobby();
        assert_eq!(game.apply(42, GameCommand::StartGame), Err(GameError::NotInGame));
    }

    #[test]
    fn bad_mode_string_is_invalid_input_and_changes_nothing() {
        let mut game = lobby();
        game.apply(1, GameCommand::StartGame).unwrap();
        game.apply(1, GameCommand::ProceedToFirstNight).unwrap();
        let before = game.night().mode();

        let err = game
            .apply(
                1,
                GameCommand::SetNightMode {
                    mode: "banana".into(),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::models::error::ErrorKind::InvalidInput);
        assert_eq!(game.night().mode(), before);
        assert_eq!(game.phase(), GamePhase::Night);
    }

    #[test]
    fn reveal_commands_name_their_reveal() {
        assert_eq!(
            GameCommand::StartMorningReveal.starts_reveal(),
            Some(RevealKind::Morning)
        );
        assert_eq!(
            GameCommand::RevealRunoffVotes.starts_reveal(),
            Some(RevealKind::Votes)
        );
        assert_eq!(GameCommand::OpenVoting.starts_reveal(), None);
    }

    #[test]
    fn outcomes_serialize_with_a_tag() {
        let json = serde_json::to_value(CommandOutcome::VoteCast {
            progress: VoteProgress::new(2, 4),
        })
        .unwrap();
        assert_eq!(json["outcome"], "vote_cast");
        assert_eq!(json["progress"]["cast"], 2);
        assert_eq!(json["progress"]["all_voted"], false);
    }
}
