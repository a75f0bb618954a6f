use serde::{Deserialize, Serialize};

use super::role::Role;

/// Public seat number. Stable for the whole match, unlike the session token.
pub type PlayerId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EliminationCause {
    Murder,
    Banishment,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    /// Transport credential; rotated whenever the player rejoins.
    pub session_id: String,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub eliminated: bool,
    pub eliminated_by: Option<EliminationCause>,
    pub is_host: bool,
    pub disconnected: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, session_id: String) -> Self {
        Self {
            id,
            session_id,
            name,
            role: None,
            alive: true,
            eliminated: false,
            eliminated_by: None,
            is_host: false,
            disconnected: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive && !self.eliminated
    }

    pub fn is_traitor(&self) -> bool {
        self.role == Some(Role::Traitor)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    pub(crate) fn eliminate(&mut self, cause: EliminationCause) {
        self.alive = false;
        self.eliminated = true;
        self.eliminated_by = Some(cause);
    }
}
