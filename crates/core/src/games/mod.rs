//! Per-game opcode tables and conventions.

pub mod ever17;
pub mod never7;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{state_error, VnError};
use crate::registry::OpcodeTable;
use crate::text::TextCodec;
use crate::token::{ConvAction, EventAction};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    #[default]
    Ever17,
    Never7,
}

impl Game {
    pub fn codec(self) -> TextCodec {
        match self {
            Game::Ever17 => TextCodec::Ever17,
            Game::Never7 => TextCodec::Never7,
        }
    }

    /// Script the game boots into.
    pub fn start_script(self) -> &'static str {
        match self {
            Game::Ever17 => "op00",
            Game::Never7 => "OP",
        }
    }

    /// Archive holding the voice clips.
    pub fn voice_archive(self) -> &'static str {
        match self {
            Game::Ever17 => "voice.dat",
            Game::Never7 => "wave.dat",
        }
    }

    pub fn event_table(self) -> &'static OpcodeTable<EventAction> {
        match self {
            Game::Ever17 => ever17::event_table(),
            Game::Never7 => never7::event_table(),
        }
    }

    pub fn conv_table(self) -> &'static OpcodeTable<ConvAction> {
        match self {
            Game::Ever17 => ever17::conv_table(),
            Game::Never7 => never7::conv_table(),
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Game::Ever17 => "ever17",
            Game::Never7 => "never7",
        })
    }
}

impl FromStr for Game {
    type Err = VnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ever17" | "e17" => Ok(Game::Ever17),
            "never7" | "n7" => Ok(Game::Never7),
            other => Err(state_error(format!("unknown game '{other}'"))),
        }
    }
}

#[cfg(test)]
#[path = "tests/games_tests.rs"]
mod tests;
