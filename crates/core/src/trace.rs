//! Recorded front-end calls for headless playback and deterministic testing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::VnResult;
use crate::runtime::{
    Choice, Frontend, Interpreter, MediaRef, MediaStorage, PathState, PlaybackState, Rgb,
    Viewport,
};

/// One call the interpreter made into the front end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrontendCall {
    DisplayBackground {
        name: String,
        viewport: Viewport,
        fade: f64,
    },
    PanzoomBackground {
        viewport: Viewport,
        seconds: f64,
    },
    FadeBackgroundFill {
        color: Rgb,
        seconds: f64,
    },
    DisplayCharart {
        name: String,
        slot: i64,
        x: i64,
        fade: f64,
    },
    ClearCharart {
        slot: i64,
        fade: f64,
    },
    ClearCharartAll {
        fade: f64,
    },
    FadeTextbox {
        fade: f64,
    },
    UnfadeTextbox {
        fade: f64,
    },
    Textblock {
        lines: Vec<String>,
        voice: Option<String>,
    },
    Choice {
        options: Vec<String>,
        answer: Option<usize>,
    },
    Movie {
        name: String,
    },
}

/// How a [`RecordingFrontend`] answers choices.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoicePolicy {
    #[default]
    First,
    Last,
    /// Answers in order from the list, then falls back to the first option.
    Scripted(Vec<usize>),
    /// Leaves choices for the caller to answer.
    Unanswered,
}

/// Front end that records every call and answers choices by policy.
#[derive(Clone, Debug, Default)]
pub struct RecordingFrontend {
    calls: Vec<FrontendCall>,
    policy: ChoicePolicy,
    answered: usize,
}

impl RecordingFrontend {
    pub fn new(policy: ChoicePolicy) -> Self {
        Self {
            calls: Vec::new(),
            policy,
            answered: 0,
        }
    }

    pub fn calls(&self) -> &[FrontendCall] {
        &self.calls
    }

    /// Takes the calls recorded so far.
    pub fn drain(&mut self) -> Vec<FrontendCall> {
        std::mem::take(&mut self.calls)
    }

    fn pick(&mut self, choice: &Choice) -> Option<usize> {
        let count = choice.options().len();
        let pick = match &self.policy {
            ChoicePolicy::First => 0,
            ChoicePolicy::Last => count.checked_sub(1)?,
            ChoicePolicy::Scripted(answers) => answers.get(self.answered).copied().unwrap_or(0),
            ChoicePolicy::Unanswered => return None,
        };
        self.answered += 1;
        Some(pick)
    }
}

impl Frontend for RecordingFrontend {
    fn display_background(&mut self, image: MediaRef<'_>, viewport: Viewport, fade: f64) {
        self.calls.push(FrontendCall::DisplayBackground {
            name: image.name.to_string(),
            viewport,
            fade,
        });
    }

    fn panzoom_background(&mut self, viewport: Viewport, seconds: f64) {
        self.calls
            .push(FrontendCall::PanzoomBackground { viewport, seconds });
    }

    fn fade_background_fill(&mut self, color: Rgb, seconds: f64) {
        self.calls
            .push(FrontendCall::FadeBackgroundFill { color, seconds });
    }

    fn display_charart(&mut self, image: MediaRef<'_>, slot: i64, x: i64, fade: f64) {
        self.calls.push(FrontendCall::DisplayCharart {
            name: image.name.to_string(),
            slot,
            x,
            fade,
        });
    }

    fn clear_charart(&mut self, slot: i64, fade: f64) {
        self.calls.push(FrontendCall::ClearCharart { slot, fade });
    }

    fn clear_charart_all(&mut self, fade: f64) {
        self.calls.push(FrontendCall::ClearCharartAll { fade });
    }

    fn fade_textbox(&mut self, fade: f64) {
        self.calls.push(FrontendCall::FadeTextbox { fade });
    }

    fn unfade_textbox(&mut self, fade: f64) {
        self.calls.push(FrontendCall::UnfadeTextbox { fade });
    }

    fn new_textblock(&mut self, lines: &[String], voice: Option<MediaRef<'_>>) {
        self.calls.push(FrontendCall::Textblock {
            lines: lines.to_vec(),
            voice: voice.map(|voice| voice.name.to_string()),
        });
    }

    fn new_choice(&mut self, choice: &mut Choice) {
        let answer = self
            .pick(choice)
            .filter(|index| choice.choose(*index).is_ok());
        self.calls.push(FrontendCall::Choice {
            options: choice
                .options()
                .iter()
                .map(|option| option.text.clone())
                .collect(),
            answer,
        });
    }

    fn play_movie(&mut self, movie: MediaRef<'_>) {
        self.calls.push(FrontendCall::Movie {
            name: movie.name.to_string(),
        });
    }
}

/// Position and scene summary of a [`PathState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDigest {
    pub script: String,
    pub es_index: usize,
    pub es_pos: usize,
    pub background: Option<String>,
    /// Slot to image name.
    pub charart: BTreeMap<i64, String>,
    /// Memory cells that are not zero.
    pub memory: BTreeMap<usize, i64>,
}

impl StateDigest {
    pub fn from_state(state: &PathState) -> Self {
        Self {
            script: state.script.clone(),
            es_index: state.es_index,
            es_pos: state.es_pos,
            background: state.background.image.clone(),
            charart: state
                .charart
                .iter()
                .map(|(slot, art)| (*slot, art.image.clone()))
                .collect(),
            memory: state
                .memory
                .iter()
                .enumerate()
                .filter(|(_, value)| **value != 0)
                .map(|(address, value)| (address, *value))
                .collect(),
        }
    }
}

/// Calls made between two yields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: u32,
    pub status: PlaybackState,
    pub calls: Vec<FrontendCall>,
    pub state: StateDigest,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlaybackTrace {
    pub steps: Vec<TraceStep>,
}

impl PlaybackTrace {
    /// Plays up to `max_yields` yields, recording each one.
    pub fn record<M: MediaStorage>(
        interpreter: &mut Interpreter<M, RecordingFrontend>,
        max_yields: u32,
    ) -> VnResult<Self> {
        let mut trace = Self::default();
        for step in 0..max_yields {
            let status = interpreter.run(1)?;
            trace.steps.push(TraceStep {
                step,
                status,
                calls: interpreter.frontend_mut().drain(),
                state: StateDigest::from_state(interpreter.state()),
            });
            if status == PlaybackState::Ended {
                break;
            }
        }
        Ok(trace)
    }

    pub fn to_json(&self) -> VnResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| crate::error::plain_serialization_error(err.to_string()))
    }
}
