//! Token interpreter that plays a script through a [`Frontend`].

mod actions;
mod backlog;
mod choice;
mod frontend;
mod state;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{playback_error, state_error, VnError, VnResult};
use crate::games::Game;
use crate::script::{ParseOptions, ScriptFile};
use crate::token::Token;

pub use backlog::{BacklogEntry, BacklogItem};
pub use choice::{Choice, ChoiceOption};
pub use frontend::{Frontend, MediaRef, MediaStorage};
pub use state::{
    Background, CallFrame, CharArtSlot, ConvPosition, PathState, Rgb, Viewport, MEMORY_CELLS,
};

/// Why [`Interpreter::process_tokens`] returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Running,
    /// Text is on screen; wait for the user.
    UserAck,
    /// A choice was posed and needs an answer.
    Choice,
    /// A visible change happened; the front end may animate it.
    GraphicsOp,
    Ended,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    pub game: Game,
    /// Script to start from instead of the game's default.
    pub start_script: Option<String>,
    /// Skip tokens the interpreter cannot act on instead of stopping.
    pub continue_on_error: bool,
    /// Seed for the random draws of active values. Drawn from the OS when unset.
    pub seed: Option<u64>,
    pub parse: ParseOptions,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            game: Game::default(),
            start_script: None,
            continue_on_error: true,
            seed: None,
            parse: ParseOptions::default(),
        }
    }
}

impl RuntimeOptions {
    pub fn start_script(&self) -> &str {
        self.start_script
            .as_deref()
            .unwrap_or_else(|| self.game.start_script())
    }
}

/// Interpreter over one game's scripts.
pub struct Interpreter<M, F> {
    media: M,
    frontend: F,
    options: RuntimeOptions,
    script: Rc<ScriptFile>,
    events: Rc<[Token]>,
    conv: Option<Rc<[Token]>>,
    state: PathState,
    backlog: Vec<BacklogEntry>,
}

impl<M: MediaStorage, F: Frontend> Interpreter<M, F> {
    /// Loads the start script and positions playback at its first event chunk.
    pub fn new(mut media: M, frontend: F, options: RuntimeOptions) -> VnResult<Self> {
        let start = options.start_script().to_string();
        let seed = options.seed.unwrap_or_else(rand::random);
        let script = load_script(&mut media, &start, &options)?;
        let events = tokenize_events(&script, 0)?;
        tracing::info!(script = %start, game = %options.game, seed, "interpreter ready");
        Ok(Self {
            media,
            frontend,
            options,
            script,
            events,
            conv: None,
            state: PathState::new(start, seed),
            backlog: Vec::new(),
        })
    }

    /// Runs tokens until playback yields, ends, or fails.
    ///
    /// Fails without running anything while a posed choice is unanswered,
    /// after playback ended, and after an error unless errors are skipped.
    pub fn process_tokens(&mut self) -> VnResult<PlaybackState> {
        if self.choice_pending() {
            return Err(state_error("a choice is waiting for an answer"));
        }
        match self.state.status {
            PlaybackState::Ended => return Err(state_error("playback already ended")),
            PlaybackState::Error if !self.options.continue_on_error => {
                return Err(state_error("playback stopped after an error"))
            }
            _ => {}
        }

        self.state.status = PlaybackState::Running;
        while self.state.status == PlaybackState::Running {
            let at = (self.state.es_index, self.state.es_pos, self.state.conv);
            if let Err(error) = self.advance() {
                let position = self.describe(at);
                if self.options.continue_on_error && matches!(error, VnError::Playback(_)) {
                    tracing::warn!(%position, %error, "skipping token");
                    continue;
                }
                tracing::error!(%position, %error, "playback stopped");
                self.state.status = PlaybackState::Error;
                return Err(VnError::AtToken {
                    position,
                    source: Box::new(error),
                });
            }
        }
        tracing::debug!(status = ?self.state.status, "yielding");
        Ok(self.state.status)
    }

    /// Calls [`Self::process_tokens`] until playback ends or `max_yields`
    /// yields have passed. The front end must answer choices as they are posed.
    pub fn run(&mut self, max_yields: usize) -> VnResult<PlaybackState> {
        let mut status = self.state.status;
        for _ in 0..max_yields {
            status = self.process_tokens()?;
            if status == PlaybackState::Ended {
                break;
            }
            if self.choice_pending() {
                return Err(playback_error("front end left the choice unanswered"));
            }
        }
        Ok(status)
    }

    fn advance(&mut self) -> VnResult<()> {
        if let (Some(tokens), Some(position)) = (self.conv.clone(), self.state.conv) {
            if let Some(token) = tokens.get(position.pos) {
                self.state.conv = Some(ConvPosition {
                    pos: position.pos + 1,
                    ..position
                });
                return self.execute(token);
            }
            tracing::debug!(conv = position.index, "conversation finished");
            self.conv = None;
            self.state.conv = None;
            if self.choice_pending() {
                return self.pose_choice();
            }
            return Ok(());
        }

        let events = Rc::clone(&self.events);
        match events.get(self.state.es_pos) {
            Some(token) => {
                self.state.es_pos += 1;
                self.execute(token)
            }
            None => self.set_es(self.state.es_index + 1),
        }
    }

    fn describe(&self, (es_index, es_pos, conv): (usize, usize, Option<ConvPosition>)) -> String {
        match conv {
            Some(conv) => format!("{}:cs{}[{}]", self.script.name(), conv.index, conv.pos),
            None => format!("{}:es{es_index}[{es_pos}]", self.script.name()),
        }
    }

    fn choice_pending(&self) -> bool {
        self.state
            .choice
            .as_ref()
            .is_some_and(|choice| !choice.is_answered())
    }

    /// Switches to another script file and starts at its first event chunk.
    pub fn set_scr(&mut self, name: &str) -> VnResult<()> {
        tracing::info!(script = name, "switching script file");
        let script = load_script(&mut self.media, name, &self.options)?;
        self.enter(script, name, 0, 0)
    }

    /// Continues with event chunk `index` of the current script.
    pub fn set_es(&mut self, index: usize) -> VnResult<()> {
        let name = self.state.script.clone();
        self.enter(Rc::clone(&self.script), &name, index, 0)
    }

    /// Moves to token `pos` of event chunk `index` in `script`. Nothing
    /// changes unless the chunk tokenizes.
    fn enter(
        &mut self,
        script: Rc<ScriptFile>,
        name: &str,
        index: usize,
        pos: usize,
    ) -> VnResult<()> {
        let events = tokenize_events(&script, index)?;
        tracing::debug!(
            script = script.name(),
            chunk = index,
            tokens = events.len(),
            "entering event chunk"
        );
        self.script = script;
        self.events = events;
        if self.state.script != name {
            self.state.script = name.to_string();
        }
        self.state.es_index = index;
        self.state.es_pos = pos;
        Ok(())
    }

    /// Runs conversation chunk `index` before resuming the event chunk.
    pub fn set_cs(&mut self, index: usize) -> VnResult<()> {
        if let Some(active) = self.state.conv {
            return Err(state_error(format!(
                "conversation {} is still active",
                active.index
            )));
        }
        let tokens = self
            .script
            .tokenize_conv(index, false)
            .map_err(|failure| failure.error)?;
        self.conv = Some(Rc::from(tokens));
        self.state.conv = Some(ConvPosition { index, pos: 0 });
        Ok(())
    }

    /// Saves the current position for a later [`Self::return_scr`].
    pub fn push_scr_pos(&mut self) -> VnResult<()> {
        if let Some(frame) = &self.state.call_stack {
            return Err(state_error(format!(
                "return position {}:es{}[{}] already saved",
                frame.script, frame.es_index, frame.es_pos
            )));
        }
        self.state.call_stack = Some(CallFrame {
            script: self.state.script.clone(),
            es_index: self.state.es_index,
            es_pos: self.state.es_pos,
        });
        Ok(())
    }

    /// Resumes at the position saved by [`Self::push_scr_pos`].
    pub fn return_scr(&mut self) -> VnResult<()> {
        let frame = self
            .state
            .call_stack
            .clone()
            .ok_or_else(|| state_error("return without a saved position"))?;
        let script = if frame.script.eq_ignore_ascii_case(&self.state.script) {
            Rc::clone(&self.script)
        } else {
            load_script(&mut self.media, &frame.script, &self.options)?
        };
        self.enter(script, &frame.script, frame.es_index, frame.es_pos)?;
        self.state.call_stack = None;
        Ok(())
    }

    /// Answers the posed choice with displayed option `index`.
    pub fn choose(&mut self, index: usize) -> VnResult<()> {
        self.state
            .choice
            .as_mut()
            .ok_or_else(|| state_error("no choice to answer"))?
            .choose(index)
    }

    pub(crate) fn new_choice(&mut self, id: Option<u16>) -> VnResult<()> {
        if self.state.choice.is_some() {
            return Err(state_error("a choice is already being built"));
        }
        self.state.choice = Some(Choice::new(id));
        Ok(())
    }

    /// Removes the answered choice.
    pub(crate) fn reap_choice(&mut self) -> VnResult<Choice> {
        match self.state.choice.take() {
            Some(choice) if choice.is_answered() => Ok(choice),
            Some(choice) => {
                self.state.choice = Some(choice);
                Err(state_error("choice has not been answered"))
            }
            None => Err(state_error("no choice to collect")),
        }
    }

    fn pose_choice(&mut self) -> VnResult<()> {
        let Some(mut choice) = self.state.choice.take() else {
            return Err(state_error("no choice to pose"));
        };
        if choice.options().is_empty() {
            return Err(playback_error(format!(
                "choice with {} candidates has nothing to display",
                choice.candidates()
            )));
        }
        self.state.status = PlaybackState::Choice;
        self.state.choice = Some(choice.clone());
        let snapshot = self.get_path_state();
        self.backlog.push(BacklogEntry {
            item: BacklogItem::Choice {
                choice: choice.clone(),
            },
            state: snapshot,
        });
        self.frontend.new_choice(&mut choice);
        self.state.choice = Some(choice);
        Ok(())
    }

    /// Copy of the state needed to resume playback here.
    pub fn get_path_state(&self) -> PathState {
        self.state.clone()
    }

    /// Resumes at a previously captured state and redraws the scene.
    /// The backlog is left as it is.
    pub fn restore_state(&mut self, state: PathState) -> VnResult<()> {
        let script = load_script(&mut self.media, &state.script, &self.options)?;
        let events = tokenize_events(&script, state.es_index)?;
        let conv: Option<Rc<[Token]>> = match state.conv {
            Some(position) => Some(Rc::from(
                script
                    .tokenize_conv(position.index, false)
                    .map_err(|failure| failure.error)?,
            )),
            None => None,
        };
        tracing::info!(script = %state.script, chunk = state.es_index, "restoring state");
        self.script = script;
        self.events = events;
        self.conv = conv;
        self.state = state;
        self.redisplay()
    }

    /// Rewinds to backlog entry `index`, redisplays it, and drops every
    /// later entry. Playback continues with the next [`Self::process_tokens`].
    pub fn jump_back(&mut self, index: usize) -> VnResult<()> {
        let entry = self.backlog.get(index).cloned().ok_or_else(|| {
            state_error(format!(
                "backlog entry {index} out of range ({} entries)",
                self.backlog.len()
            ))
        })?;
        self.restore_state(entry.state)?;
        self.backlog.truncate(index + 1);
        match entry.item {
            BacklogItem::Textblock { lines, voice } => {
                self.show_textblock(&lines, voice.as_deref())?;
            }
            BacklogItem::Choice { mut choice } => {
                self.frontend.new_choice(&mut choice);
                self.state.choice = Some(choice);
            }
        }
        Ok(())
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn status(&self) -> PlaybackState {
        self.state.status
    }

    pub fn backlog(&self) -> &[BacklogEntry] {
        &self.backlog
    }

    pub fn script(&self) -> &ScriptFile {
        &self.script
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn into_frontend(self) -> F {
        self.frontend
    }
}

fn load_script<M: MediaStorage>(
    media: &mut M,
    name: &str,
    options: &RuntimeOptions,
) -> VnResult<Rc<ScriptFile>> {
    let domain = media.script(name)?;
    Ok(Rc::new(ScriptFile::parse(
        domain,
        name,
        options.game,
        options.parse,
    )?))
}

fn tokenize_events(script: &ScriptFile, index: usize) -> VnResult<Rc<[Token]>> {
    script
        .tokenize_event(index, false)
        .map(Rc::from)
        .map_err(|failure| failure.error)
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
