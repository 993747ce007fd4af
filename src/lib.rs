//! Ever17 / Never7 script engine: the SC3 tokenizer and interpreter from
//! [`sc3_engine`] wired to the media storages of [`sc3_assets`].

use std::path::Path;

pub use sc3_assets as assets;
pub use sc3_engine as engine;

pub use sc3_assets::{AssetError, DirectoryStorage, LnkMediaStorage, MediaKind};
pub use sc3_engine::{
    ChoicePolicy, EngineConfig, Frontend, Game, Interpreter, MediaStorage, PlaybackState,
    PlaybackTrace, RecordingFrontend, RuntimeOptions, SaveData, ScriptFile, VnError, VnResult,
};

/// Media of a game installed at `root`. Installs that ship `script.dat` are
/// read through their LNK archives, anything else as extracted directories.
pub fn open_media(root: &Path, config: &EngineConfig) -> Box<dyn MediaStorage> {
    let game = config.runtime.game;
    let budget = config.media.cache_budget;
    let archived = ["script.dat", "SCRIPT.DAT"]
        .iter()
        .any(|name| root.join(name).is_file());
    tracing::info!(root = %root.display(), %game, archived, "opening game media");
    if archived {
        Box::new(LnkMediaStorage::new(root, game).with_cache_budget(budget))
    } else {
        Box::new(DirectoryStorage::new(root, game).with_cache_budget(budget))
    }
}

/// Interpreter over the game at `root` that records front-end calls and
/// answers choices with `policy`.
pub fn headless(
    root: &Path,
    config: &EngineConfig,
    policy: ChoicePolicy,
) -> VnResult<Interpreter<Box<dyn MediaStorage>, RecordingFrontend>> {
    Interpreter::new(
        open_media(root, config),
        RecordingFrontend::new(policy),
        config.runtime.clone(),
    )
}
