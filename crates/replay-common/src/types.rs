//! Common types used across the workspace

use crate::error::ReplayCommonError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Game type assigned when a request does not specify one
pub const DEFAULT_GAME_TYPE: char = '1';

/// Single-character game discriminator stored with every replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameType(char);

impl GameType {
    pub fn new(value: char) -> Self {
        Self(value)
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl Default for GameType {
    fn default() -> Self {
        Self(DEFAULT_GAME_TYPE)
    }
}

impl FromStr for GameType {
    type Err = ReplayCommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Self(c)),
            _ => Err(ReplayCommonError::InvalidGameType(s.to_string())),
        }
    }
}

impl TryFrom<String> for GameType {
    type Error = ReplayCommonError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GameType> for String {
    fn from(value: GameType) -> Self {
        value.0.to_string()
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
