use serde::Serialize;

use super::game::GamePhase;

/// Coarse classification used by the transport layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    WrongPhase,
    NotHost,
    NotInGame,
    NotFound,
    InvalidInput,
    NotAllowed,
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Game not found")]
    GameNotFound,
    #[error("Player not found in game")]
    PlayerNotFound,
    #[error("Not in a game")]
    NotInGame,
    #[error("Not the host")]
    NotHost,
    #[error("Action not available during {0}")]
    WrongPhase(GamePhase),
    #[error("Game already started")]
    AlreadyStarted,
    #[error("Game is full (max {0})")]
    Full(usize),
    #[error("Name already taken")]
    NameTaken,
    #[error("Invalid player name")]
    InvalidName,
    #[error("Invalid game code")]
    InvalidCode,
    #[error("Invalid traitor count (1-{0})")]
    InvalidTraitorCount(usize),
    #[error("Need at least {0} players")]
    NotEnoughPlayers(usize),
    #[error("Too many traitors for this many players")]
    TooManyTraitors,
    #[error("Not a traitor")]
    NotTraitor,
    #[error("Invalid target")]
    InvalidTarget,
    #[error("Cannot target a Traitor")]
    CannotTargetOwnFaction,
    #[error("Unknown night mode: {0}")]
    InvalidNightMode(String),
    #[error("Night mode choice is not available tonight")]
    NightModeChoiceUnavailable,
    #[error("Traitors have not all selected the same target")]
    NotAllAgreed,
    #[error("Voting not open")]
    VotingNotOpen,
    #[error("Not a valid voter")]
    InvalidVoter,
    #[error("Cannot vote for yourself")]
    SelfVote,
    #[error("Not a runoff candidate")]
    NotRunoffCandidate,
    #[error("Not all votes are in")]
    VotesOutstanding,
    #[error("Reveal already started")]
    RevealAlreadyStarted,
    #[error("Reveal has not finished")]
    RevealIncomplete,
    #[error("No tie is waiting for the host")]
    NoTieToBreak,
    #[error("End game not available yet")]
    EndGameUnavailable,
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::GameNotFound | GameError::PlayerNotFound => ErrorKind::NotFound,
            GameError::NotInGame => ErrorKind::NotInGame,
            GameError::NotHost => ErrorKind::NotHost,
            GameError::WrongPhase(_) | GameError::AlreadyStarted | GameError::VotingNotOpen => {
                ErrorKind::WrongPhase
            }
            GameError::NameTaken
            | GameError::InvalidName
            | GameError::InvalidCode
            | GameError::InvalidTraitorCount(_)
            | GameError::NotEnoughPlayers(_)
            | GameError::TooManyTraitors
            | GameError::InvalidNightMode(_)
            | GameError::InvalidChoice(_) => ErrorKind::InvalidInput,
            GameError::Full(_)
            | GameError::NotTraitor
            | GameError::InvalidTarget
            | GameError::CannotTargetOwnFaction
            | GameError::NightModeChoiceUnavailable
            | GameError::InvalidVoter
            | GameError::SelfVote
            | GameError::NotRunoffCandidate
            | GameError::RevealAlreadyStarted
            | GameError::EndGameUnavailable => ErrorKind::NotAllowed,
            GameError::NotAllAgreed
            | GameError::VotesOutstanding
            | GameError::RevealIncomplete
            | GameError::NoTieToBreak => ErrorKind::NotReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(GameError::NotEnoughPlayers(4).kind(), ErrorKind::InvalidInput);
        assert_eq!(GameError::SelfVote.kind(), ErrorKind::NotAllowed);
        assert_eq!(GameError::NotAllAgreed.kind(), ErrorKind::NotReady);
        assert_eq!(GameError::VotingNotOpen.kind(), ErrorKind::WrongPhase);
        assert_eq!(GameError::GameNotFound.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(GameError::Full(20).to_string(), "Game is full (max 20)");
        assert_eq!(
            GameError::WrongPhase(GamePhase::Night).to_string(),
            "Action not available during NIGHT"
        );
    }
}
