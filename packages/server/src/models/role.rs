use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Faithful,
    Traitor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Faithful => write!(f, "Faithful"),
            Role::Traitor => write!(f, "Traitor"),
        }
    }
}

/// Which faction won the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Faithful,
    Traitors,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Faithful => write!(f, "Faithful"),
            Winner::Traitors => write!(f, "Traitors"),
        }
    }
}

/// Cosmetic theme picked by the host. The game logic never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Traitors,
    Werewolf,
    Mole,
    Cowboys,
    Queer,
}

impl Theme {
    /// Unknown or missing theme names fall back to the default theme.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("werewolf") => Theme::Werewolf,
            Some("mole") => Theme::Mole,
            Some("cowboys") => Theme::Cowboys,
            Some("queer") => Theme::Queer,
            _ => Theme::Traitors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_falls_back_to_default() {
        assert_eq!(Theme::from_name(Some("Werewolf")), Theme::Werewolf);
        assert_eq!(Theme::from_name(Some("pirates")), Theme::Traitors);
        assert_eq!(Theme::from_name(None), Theme::Traitors);
    }

    #[test]
    fn roles_serialize_in_wire_case() {
        assert_eq!(serde_json::to_string(&Role::Traitor).unwrap(), "\"TRAITOR\"");
        assert_eq!(serde_json::to_string(&Winner::Faithful).unwrap(), "\"FAITHFUL\"");
    }
}
