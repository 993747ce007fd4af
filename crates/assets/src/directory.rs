use std::fs;
use std::path::{Path, PathBuf};

use sc3_engine::config::DEFAULT_CACHE_BUDGET;
use sc3_engine::{Domain, Game, MediaStorage, VnResult};
use walkdir::WalkDir;

use crate::cache::ByteCache;
use crate::{sanitize_rel_path, AssetError, MediaKind};

/// Media laid out as extracted archives: `script/`, `bg/`, `chara/`,
/// `voice/` (Never7: `wave/`) and `movie/` under one root.
#[derive(Debug)]
pub struct DirectoryStorage {
    root: PathBuf,
    game: Game,
    cache: ByteCache,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>, game: Game) -> Self {
        Self {
            root: root.into(),
            game,
            cache: ByteCache::new(DEFAULT_CACHE_BUDGET),
        }
    }

    pub fn with_cache_budget(mut self, budget_bytes: usize) -> Self {
        self.cache = ByteCache::new(budget_bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cached_bytes(&self) -> usize {
        self.cache.current_bytes()
    }

    /// Reads one media file, matching its name case-insensitively.
    pub fn load(&mut self, kind: MediaKind, name: &str) -> Result<Domain, AssetError> {
        let key = format!("{}/{}", kind.archive(self.game), name.to_lowercase());
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }

        let dir = self.root.join(kind.archive(self.game));
        let path = match kind {
            MediaKind::Movie => find_movie(&dir, name)?,
            _ => find_file(&dir, &kind.file_name(name))?,
        }
        .ok_or_else(|| AssetError::Missing {
            kind: kind.label(),
            name: name.to_string(),
        })?;

        let data = Domain::new(fs::read(&path)?);
        tracing::debug!(path = %path.display(), bytes = data.len(), "read media file");
        self.cache.insert(key, data.clone());
        Ok(data)
    }
}

impl MediaStorage for DirectoryStorage {
    fn script(&mut self, name: &str) -> VnResult<Domain> {
        Ok(self.load(MediaKind::Script, name)?)
    }

    fn background(&mut self, name: &str) -> VnResult<Domain> {
        Ok(self.load(MediaKind::Background, name)?)
    }

    fn character_art(&mut self, name: &str) -> VnResult<Domain> {
        Ok(self.load(MediaKind::CharacterArt, name)?)
    }

    fn voice(&mut self, name: &str) -> VnResult<Domain> {
        Ok(self.load(MediaKind::Voice, name)?)
    }

    fn movie(&mut self, name: &str) -> VnResult<Domain> {
        Ok(self.load(MediaKind::Movie, name)?)
    }
}

/// Entry of `dir` whose relative path equals `name` ignoring ASCII case.
pub(crate) fn find_file(dir: &Path, name: &str) -> Result<Option<PathBuf>, AssetError> {
    let rel = sanitize_rel_path(Path::new(name))?;
    let exact = dir.join(&rel);
    if exact.is_file() {
        return Ok(Some(exact));
    }
    let depth = rel.components().count();
    let wanted = rel.to_string_lossy().replace('\\', "/");
    Ok(WalkDir::new(dir)
        .min_depth(depth)
        .max_depth(depth)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry.path().strip_prefix(dir).is_ok_and(|found| {
                found
                    .to_string_lossy()
                    .replace('\\', "/")
                    .eq_ignore_ascii_case(&wanted)
            })
        })
        .map(|entry| entry.into_path()))
}

/// File in `dir` whose lower-cased stem is `name` lower-cased.
pub(crate) fn find_movie(dir: &Path, name: &str) -> Result<Option<PathBuf>, AssetError> {
    let rel = sanitize_rel_path(Path::new(name))?;
    let wanted = rel.to_string_lossy().to_lowercase();
    Ok(WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .path()
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy().to_lowercase() == wanted)
        })
        .map(|entry| entry.into_path()))
}
