use serde::{Deserialize, Serialize};

use crate::error::{state_error, VnResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub text: String,
    /// Position among the displayed options.
    pub index: usize,
    /// Position among every candidate, displayed or not.
    pub candidate: usize,
}

/// A question built from conversation tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: Option<u16>,
    options: Vec<ChoiceOption>,
    candidates: usize,
    chosen: Option<usize>,
}

impl Choice {
    pub fn new(id: Option<u16>) -> Self {
        Self {
            id,
            options: Vec::new(),
            candidates: 0,
            chosen: None,
        }
    }

    /// Counts a candidate; only displayed ones become selectable options.
    pub fn add_option(&mut self, text: impl Into<String>, display: bool) {
        if display {
            self.options.push(ChoiceOption {
                text: text.into(),
                index: self.options.len(),
                candidate: self.candidates,
            });
        }
        self.candidates += 1;
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn is_answered(&self) -> bool {
        self.chosen.is_some()
    }

    pub fn choose(&mut self, index: usize) -> VnResult<()> {
        if let Some(previous) = self.chosen {
            return Err(state_error(format!(
                "choice already answered with option {previous}"
            )));
        }
        if index >= self.options.len() {
            return Err(state_error(format!(
                "option {index} out of range for {} displayed options",
                self.options.len()
            )));
        }
        self.chosen = Some(index);
        Ok(())
    }

    pub fn chosen(&self) -> Option<&ChoiceOption> {
        self.chosen.and_then(|index| self.options.get(index))
    }

    /// Candidate index of the answer.
    pub fn result(&self) -> VnResult<usize> {
        self.chosen()
            .map(|option| option.candidate)
            .ok_or_else(|| state_error("choice has not been answered"))
    }
}
