use std::fmt;

use sc3_engine::Game;

/// The kinds of media a script refers to, and where each game keeps them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaKind {
    Script,
    Background,
    CharacterArt,
    Voice,
    Movie,
}

impl MediaKind {
    /// Archive stem: `<stem>.dat` for LNK storage, `<stem>/` for directories.
    /// Movies are always loose files under `movie/`.
    pub fn archive(self, game: Game) -> &'static str {
        match (self, game) {
            (MediaKind::Script, _) => "script",
            (MediaKind::Background, _) => "bg",
            (MediaKind::CharacterArt, _) => "chara",
            (MediaKind::Voice, game) => game
                .voice_archive()
                .strip_suffix(".dat")
                .unwrap_or(game.voice_archive()),
            (MediaKind::Movie, _) => "movie",
        }
    }

    pub fn suffix(self) -> Option<&'static str> {
        match self {
            MediaKind::Script => Some("scr"),
            MediaKind::Background | MediaKind::CharacterArt => Some("cps"),
            MediaKind::Voice => Some("waf"),
            MediaKind::Movie => None,
        }
    }

    /// Name used in missing-media errors.
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Script => "script",
            MediaKind::Background => "background",
            MediaKind::CharacterArt => "character art",
            MediaKind::Voice => "voice",
            MediaKind::Movie => "movie",
        }
    }

    /// File name for a script-supplied media name. Names that already carry
    /// an extension are kept as they are.
    pub fn file_name(self, name: &str) -> String {
        match self.suffix() {
            Some(suffix) if !name.contains('.') => format!("{name}.{suffix}"),
            _ => name.to_string(),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
