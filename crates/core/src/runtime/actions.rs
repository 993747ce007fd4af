//! What each token does to the interpreter.

use crate::av::AvContext;
use crate::error::{playback_error, state_error, VnError, VnResult};
use crate::games::Game;
use crate::token::{
    ChoiceEntry, ConvAction, EventAction, OpToken, Operand, Token, TokenKind, VoiceSource,
};

use super::backlog::{BacklogEntry, BacklogItem};
use super::frontend::{Frontend, MediaRef, MediaStorage};
use super::state::{CharArtSlot, Rgb, Viewport};
use super::{Interpreter, PlaybackState};

/// Default transition time for scene changes, in seconds.
const FADE: f64 = 0.1;

impl<M: MediaStorage, F: Frontend> Interpreter<M, F> {
    pub(super) fn execute(&mut self, token: &Token) -> VnResult<()> {
        tracing::debug!(token = %token.format_hr(&self.script), "processing token");
        match token.kind() {
            TokenKind::Event(op) => self.event(op),
            TokenKind::Conv(op) => self.conversation(op),
            TokenKind::Textblock(block) => {
                let voice = match &block.voice {
                    VoiceSource::None => None,
                    VoiceSource::Clip(name) => Some(media_name(name)),
                    VoiceSource::Pushed => self.state.pushed_voice.take(),
                };
                self.new_textblock(block.lines.clone(), voice)
            }
            TokenKind::Text(_) | TokenKind::NonTokenData(_) => Err(playback_error(format!(
                "unsupported token {}",
                token.format_hr(&self.script)
            ))),
        }
    }

    fn event(&mut self, op: &OpToken<EventAction>) -> VnResult<()> {
        match op.def().action {
            EventAction::Data | EventAction::ScriptLink | EventAction::JumpTable => {
                Err(unsupported(op))
            }
            EventAction::End => {
                tracing::info!(script = %self.state.script, "reached the end");
                self.state.status = PlaybackState::Ended;
                Ok(())
            }
            EventAction::Jump => self.set_es(jump_target(op)?),
            EventAction::ReturnableJump => {
                self.push_scr_pos()?;
                self.set_es(jump_target(op)?)
            }
            EventAction::CondJump => {
                let inverse = op.u8(0)? == 0;
                let taken = op.av(1)?.evaluate_one(&mut self.state)? != 0;
                if taken != inverse {
                    self.set_es(jump_target(op)?)?;
                }
                Ok(())
            }
            EventAction::LoadR1 => {
                let value = op.av(0)?.evaluate_one(&mut self.state)?;
                self.state.r1 = Some(value);
                Ok(())
            }
            EventAction::RegJump => {
                let value = op.av(0)?.evaluate_one(&mut self.state)?;
                if self.state.r1 == Some(value) {
                    self.set_es(jump_target(op)?)?;
                }
                Ok(())
            }
            EventAction::Return => self.return_scr(),
            EventAction::FileJump => self.set_scr(&media_name(op.bytes(0)?)),
            EventAction::ReturnableFileJump => {
                let name = media_name(op.bytes(1)?);
                self.push_scr_pos()?;
                self.set_scr(&name).inspect_err(|_| self.state.call_stack = None)
            }
            EventAction::Background => {
                let name = self.filename(op, 0)?;
                self.display_background(&name, Viewport::Full)
            }
            EventAction::PartialBackground => {
                let name = self.filename(op, 0)?;
                let viewport = self.rect(op, 3)?;
                self.display_background(&name, viewport)
            }
            EventAction::ScrollBackground => {
                let name = self.filename(op, 0)?;
                let y = self.value(op, 1)?;
                self.display_background(&name, Viewport::Scroll { y })
            }
            EventAction::PanZoom => {
                let viewport = self.rect(op, 0)?;
                let delay = self.value(op, 4)?;
                self.panzoom_background(viewport, delay as f64 / 60.0);
                Ok(())
            }
            EventAction::ScrollPan => {
                let y = self.value(op, 0)?;
                let delay = self.value(op, 1)?;
                self.panzoom_background(Viewport::Scroll { y }, delay as f64 / 20.0);
                Ok(())
            }
            EventAction::Fade => {
                let color = match self.value(op, 0)? {
                    0 => Rgb::BLACK,
                    1 => Rgb::WHITE,
                    3 => Rgb::RED,
                    other => return Err(playback_error(format!("unknown fill colour {other}"))),
                };
                self.fade_background_fill(color, FADE);
                Ok(())
            }
            EventAction::CharArt { one_based } => {
                let slot = self.value(op, 0)? - i64::from(one_based);
                let name = self.filename(op, 1)?;
                let x = self.value(op, 2)?;
                self.draw_charart(name, slot, x)
            }
            EventAction::CharArtPair => {
                let slots = [self.value(op, 0)? - 1, self.value(op, 1)? - 1];
                let names = [self.filename(op, 2)?, self.filename(op, 3)?];
                let xs = [self.value(op, 4)?, self.value(op, 5)?];
                for ((slot, name), x) in slots.into_iter().zip(names).zip(xs) {
                    self.draw_charart(name, slot, x)?;
                }
                Ok(())
            }
            EventAction::CharArtTriple => {
                for slot in 0..3 {
                    let name = self.filename(op, slot)?;
                    let x = self.value(op, slot + 3)?;
                    self.draw_charart(name, slot as i64, x)?;
                }
                Ok(())
            }
            EventAction::ClearCharArt { one_based } => {
                let slot = self.value(op, 0)? - i64::from(one_based);
                self.clear_charart(slot);
                Ok(())
            }
            EventAction::ClearAll => {
                self.clear_charart_all(0.0);
                Ok(())
            }
            EventAction::TextboxOff => {
                self.fade_textbox(FADE);
                Ok(())
            }
            EventAction::ChoiceStore { check_id } => {
                let address = self.value(op, 0)?;
                let expected = if check_id {
                    Some(self.value(op, 1)?)
                } else {
                    None
                };
                if self.state.choice.is_none() && self.options.continue_on_error {
                    // The choice was dropped when it had nothing to display.
                    return Err(playback_error("no posed choice to store"));
                }
                let choice = self.reap_choice()?;
                if let Some(expected) = expected {
                    if choice.id.map(i64::from) != Some(expected) {
                        return Err(state_error(format!(
                            "choice id mismatch: expected {expected}, got {:?}",
                            choice.id
                        )));
                    }
                }
                let answer = choice.result()?;
                tracing::debug!(address, answer, "storing choice result");
                self.state.set_memory(address, answer as i64)
            }
            EventAction::Memop => {
                op.av(0)?.evaluate(&mut self.state, Some(1))?;
                Ok(())
            }
            EventAction::LoadConversation => self.set_cs(usize::from(op.convr(0)?.index)),
            EventAction::Movie => {
                let name = media_name(op.bytes(0)?);
                self.play_movie(&name);
                Ok(())
            }
            EventAction::VoicePush => {
                let name = media_name(op.bytes(0)?);
                if let Some(pending) = &self.state.pushed_voice {
                    return Err(state_error(format!(
                        "voice '{name}' pushed while '{pending}' is still pending"
                    )));
                }
                self.state.pushed_voice = Some(name);
                Ok(())
            }
        }
    }

    fn conversation(&mut self, op: &OpToken<ConvAction>) -> VnResult<()> {
        match op.def().action {
            ConvAction::UserAck => {
                self.state.status = PlaybackState::UserAck;
                Ok(())
            }
            ConvAction::Section => Ok(()),
            ConvAction::ChoiceEntry => match op.choice(0)? {
                ChoiceEntry::Question { id } => self.new_choice(Some(*id)),
                ChoiceEntry::Option { display, text } => {
                    let shown = match display {
                        Some(value) => value.evaluate_one(&mut self.state)? != 0,
                        None => true,
                    };
                    self.state
                        .choice
                        .as_mut()
                        .ok_or_else(|| state_error(format!("option {text:?} outside a choice")))?
                        .add_option(text.clone(), shown);
                    Ok(())
                }
            },
            ConvAction::ChoiceOption => {
                let text = op.text(1)?.to_string();
                if self.state.choice.is_none() {
                    self.new_choice(None)?;
                }
                if let Some(choice) = self.state.choice.as_mut() {
                    choice.add_option(text, true);
                }
                Ok(())
            }
            ConvAction::Data
            | ConvAction::Linefeed
            | ConvAction::BlockPrefix
            | ConvAction::TextAux
            | ConvAction::Voice => Err(unsupported(op)),
        }
    }

    fn value(&mut self, op: &OpToken<EventAction>, index: usize) -> VnResult<i64> {
        op.av(index)?.evaluate_one(&mut self.state)
    }

    fn rect(&mut self, op: &OpToken<EventAction>, first: usize) -> VnResult<Viewport> {
        Ok(Viewport::Rect {
            x: self.value(op, first)?,
            y: self.value(op, first + 1)?,
            w: self.value(op, first + 2)?,
            h: self.value(op, first + 3)?,
        })
    }

    fn filename(&self, op: &OpToken<EventAction>, index: usize) -> VnResult<String> {
        let reference = op.fnr(index)?;
        Ok(media_name(self.script.filename(usize::from(reference.index))?))
    }

    fn display_background(&mut self, name: &str, viewport: Viewport) -> VnResult<()> {
        let data = self.media.background(name)?;
        self.clear_charart_all(0.0);
        self.frontend
            .display_background(MediaRef { name, data: &data }, viewport, FADE);
        let background = &mut self.state.background;
        background.image = Some(name.to_string());
        background.fill = None;
        background.viewport = viewport;
        self.state.status = PlaybackState::GraphicsOp;
        Ok(())
    }

    fn panzoom_background(&mut self, viewport: Viewport, seconds: f64) {
        self.frontend.panzoom_background(viewport, seconds);
        self.state.background.viewport = viewport;
        self.state.status = PlaybackState::GraphicsOp;
    }

    fn fade_background_fill(&mut self, color: Rgb, seconds: f64) {
        self.frontend.fade_background_fill(color, seconds);
        self.state.background.fill = Some(color);
    }

    fn draw_charart(&mut self, name: String, slot: i64, x: i64) -> VnResult<()> {
        let (name, data) = match self.media.character_art(&name) {
            Ok(data) => (name, data),
            Err(error @ VnError::Media { .. }) if self.options.game == Game::Never7 => {
                let Some(fallback) = never7_fallback(&name) else {
                    return Err(error);
                };
                tracing::warn!(missing = %name, using = fallback, "character art fallback");
                let data = self.media.character_art(fallback)?;
                (fallback.to_string(), data)
            }
            Err(error) => return Err(error),
        };
        self.frontend
            .display_charart(MediaRef { name: &name, data: &data }, slot, x, FADE);
        self.state.charart.insert(slot, CharArtSlot { image: name, x });
        self.state.status = PlaybackState::GraphicsOp;
        Ok(())
    }

    fn clear_charart(&mut self, slot: i64) {
        self.frontend.clear_charart(slot, FADE);
        if self.state.charart.remove(&slot).is_none() {
            tracing::warn!(slot, "clearing empty character art slot");
        }
        self.state.status = PlaybackState::GraphicsOp;
    }

    fn clear_charart_all(&mut self, seconds: f64) {
        self.frontend.clear_charart_all(seconds);
        self.state.charart.clear();
        self.state.status = PlaybackState::GraphicsOp;
    }

    fn fade_textbox(&mut self, seconds: f64) {
        self.frontend.fade_textbox(seconds);
        self.state.textbox_faded = true;
        self.state.status = PlaybackState::GraphicsOp;
    }

    fn unfade_textbox(&mut self, seconds: f64) {
        if !self.state.textbox_faded {
            return;
        }
        self.frontend.unfade_textbox(seconds);
        self.state.textbox_faded = false;
        self.state.status = PlaybackState::GraphicsOp;
    }

    fn new_textblock(&mut self, lines: Vec<String>, voice: Option<String>) -> VnResult<()> {
        self.show_textblock(&lines, voice.as_deref())?;
        self.unfade_textbox(FADE);
        let state = self.get_path_state();
        self.backlog.push(BacklogEntry {
            item: BacklogItem::Textblock { lines, voice },
            state,
        });
        Ok(())
    }

    /// Hands a textblock to the front end without touching the backlog.
    pub(super) fn show_textblock(&mut self, lines: &[String], voice: Option<&str>) -> VnResult<()> {
        match voice {
            Some(name) => {
                let data = self.media.voice(name)?;
                self.frontend
                    .new_textblock(lines, Some(MediaRef { name, data: &data }));
            }
            None => self.frontend.new_textblock(lines, None),
        }
        Ok(())
    }

    fn play_movie(&mut self, name: &str) {
        match self.media.movie(name) {
            Ok(data) => self.frontend.play_movie(MediaRef { name, data: &data }),
            Err(error) => tracing::error!(movie = name, %error, "movie unavailable"),
        }
    }

    /// Redraws the scene described by the current state without transitions.
    pub(super) fn redisplay(&mut self) -> VnResult<()> {
        self.frontend.clear_charart_all(0.0);
        let background = self.state.background.clone();
        if let Some(color) = background.fill {
            self.frontend.fade_background_fill(color, 0.0);
        } else if let Some(name) = &background.image {
            let data = self.media.background(name)?;
            self.frontend
                .display_background(MediaRef { name, data: &data }, background.viewport, 0.0);
        }
        for (slot, art) in self.state.charart.clone() {
            let data = self.media.character_art(&art.image)?;
            self.frontend.display_charart(
                MediaRef {
                    name: &art.image,
                    data: &data,
                },
                slot,
                art.x,
                0.0,
            );
        }
        if self.state.textbox_faded {
            self.frontend.fade_textbox(0.0);
        } else {
            self.frontend.unfade_textbox(0.0);
        }
        Ok(())
    }
}

fn unsupported<A: 'static>(op: &OpToken<A>) -> VnError {
    playback_error(format!("unsupported opcode {} {}", op.path(), op.def().name))
}

fn jump_target(op: &OpToken<EventAction>) -> VnResult<usize> {
    op.operands()
        .iter()
        .find_map(|operand| match operand {
            Operand::Esr(reference) if !reference.data => Some(usize::from(reference.index)),
            _ => None,
        })
        .ok_or_else(|| state_error(format!("{} {} has no jump target", op.path(), op.def().name)))
}

fn media_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Never7 scripts name expression variants that only exist as their base
/// image: `xxNA`, `xxD` and `xxN` fall back to `xx`.
fn never7_fallback(name: &str) -> Option<&str> {
    ["NA", "D", "N"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
}
