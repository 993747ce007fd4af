//! Seams between the interpreter and the outside world.

use crate::domain::Domain;
use crate::error::VnResult;

use super::choice::Choice;
use super::state::{Rgb, Viewport};

/// Source of scripts and media, addressed by bare names as they appear in
/// scripts. Implementations add the per-kind suffix and ignore case.
pub trait MediaStorage {
    fn script(&mut self, name: &str) -> VnResult<Domain>;
    fn background(&mut self, name: &str) -> VnResult<Domain>;
    fn character_art(&mut self, name: &str) -> VnResult<Domain>;
    fn voice(&mut self, name: &str) -> VnResult<Domain>;
    fn movie(&mut self, name: &str) -> VnResult<Domain>;
}

impl<M: MediaStorage + ?Sized> MediaStorage for Box<M> {
    fn script(&mut self, name: &str) -> VnResult<Domain> {
        (**self).script(name)
    }

    fn background(&mut self, name: &str) -> VnResult<Domain> {
        (**self).background(name)
    }

    fn character_art(&mut self, name: &str) -> VnResult<Domain> {
        (**self).character_art(name)
    }

    fn voice(&mut self, name: &str) -> VnResult<Domain> {
        (**self).voice(name)
    }

    fn movie(&mut self, name: &str) -> VnResult<Domain> {
        (**self).movie(name)
    }
}

/// A named media file handed to the front end.
#[derive(Clone, Copy, Debug)]
pub struct MediaRef<'a> {
    pub name: &'a str,
    pub data: &'a Domain,
}

/// Presentation layer driven by the interpreter. Times are advisory seconds.
pub trait Frontend {
    fn display_background(&mut self, image: MediaRef<'_>, viewport: Viewport, fade: f64);
    fn panzoom_background(&mut self, viewport: Viewport, seconds: f64);
    fn fade_background_fill(&mut self, color: Rgb, seconds: f64);
    fn display_charart(&mut self, image: MediaRef<'_>, slot: i64, x: i64, fade: f64);
    fn clear_charart(&mut self, slot: i64, fade: f64);
    fn clear_charart_all(&mut self, fade: f64);
    fn fade_textbox(&mut self, fade: f64);
    fn unfade_textbox(&mut self, fade: f64);
    fn new_textblock(&mut self, lines: &[String], voice: Option<MediaRef<'_>>);
    /// Presents a choice. A front end may answer it here through
    /// [`Choice::choose`] or later through the interpreter.
    fn new_choice(&mut self, choice: &mut Choice);
    fn play_movie(&mut self, movie: MediaRef<'_>);
}
