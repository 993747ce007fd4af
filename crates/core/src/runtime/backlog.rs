use serde::{Deserialize, Serialize};

use super::choice::Choice;
use super::state::PathState;

/// Something the player has seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BacklogItem {
    Textblock {
        lines: Vec<String>,
        voice: Option<String>,
    },
    /// The choice as it was posed, before any answer.
    Choice { choice: Choice },
}

impl BacklogItem {
    /// One-line description for listings.
    pub fn summary(&self) -> String {
        match self {
            BacklogItem::Textblock { lines, .. } => lines.join(" / "),
            BacklogItem::Choice { choice } => {
                let options: Vec<&str> = choice
                    .options()
                    .iter()
                    .map(|option| option.text.as_str())
                    .collect();
                format!("choice: {}", options.join(" | "))
            }
        }
    }
}

/// A backlog item with the state to resume from after it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub item: BacklogItem,
    pub state: PathState,
}
