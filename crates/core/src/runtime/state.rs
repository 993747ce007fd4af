//! Resumable interpreter state.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::av::AvContext;
use crate::error::{evaluation_error, VnResult};

use super::choice::Choice;
use super::PlaybackState;

/// Number of addressable memory cells.
pub const MEMORY_CELLS: usize = 2048;

/// Fill colour of the background layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
}

/// Part of a background image shown on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Viewport {
    #[default]
    Full,
    Rect {
        x: i64,
        y: i64,
        w: i64,
        h: i64,
    },
    /// Vertical scroll position in half-screen steps.
    Scroll { y: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub image: Option<String>,
    /// Set while the background is a flat colour instead of an image.
    pub fill: Option<Rgb>,
    pub viewport: Viewport,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            image: None,
            fill: Some(Rgb::BLACK),
            viewport: Viewport::Full,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharArtSlot {
    pub image: String,
    pub x: i64,
}

/// Position inside the active conversation chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvPosition {
    pub index: usize,
    pub pos: usize,
}

/// Saved return point of a returnable jump.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    pub script: String,
    pub es_index: usize,
    pub es_pos: usize,
}

/// Everything needed to resume playback at a position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathState {
    pub memory: Vec<i64>,
    pub r1: Option<i64>,
    pub rng: Pcg32,
    pub script: String,
    pub es_index: usize,
    /// Index of the next event token to run.
    pub es_pos: usize,
    pub conv: Option<ConvPosition>,
    pub call_stack: Option<CallFrame>,
    pub background: Background,
    pub textbox_faded: bool,
    pub charart: BTreeMap<i64, CharArtSlot>,
    pub choice: Option<Choice>,
    pub status: PlaybackState,
    /// Voice clip named by the event script for the next textblock.
    pub pushed_voice: Option<String>,
}

impl PathState {
    pub fn new(script: impl Into<String>, seed: u64) -> Self {
        Self {
            memory: vec![0; MEMORY_CELLS],
            r1: None,
            rng: Pcg32::seed_from_u64(seed),
            script: script.into(),
            es_index: 0,
            es_pos: 0,
            conv: None,
            call_stack: None,
            background: Background::default(),
            textbox_faded: false,
            charart: BTreeMap::new(),
            choice: None,
            status: PlaybackState::Running,
            pushed_voice: None,
        }
    }
}

impl AvContext for PathState {
    fn memory(&self, address: i64) -> VnResult<i64> {
        Ok(self.memory[cell(address)?])
    }

    fn set_memory(&mut self, address: i64, value: i64) -> VnResult<()> {
        let slot = cell(address)?;
        self.memory[slot] = value;
        Ok(())
    }

    fn random(&mut self, bound: i64) -> VnResult<i64> {
        if bound <= 0 {
            return Err(evaluation_error(format!("random bound {bound} is not positive")));
        }
        Ok(self.rng.random_range(0..bound))
    }
}

fn cell(address: i64) -> VnResult<usize> {
    usize::try_from(address)
        .ok()
        .filter(|slot| *slot < MEMORY_CELLS)
        .ok_or_else(|| {
            evaluation_error(format!(
                "memory address {address} outside 0..{MEMORY_CELLS}"
            ))
        })
}
