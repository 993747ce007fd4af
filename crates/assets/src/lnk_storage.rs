use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sc3_engine::config::DEFAULT_CACHE_BUDGET;
use sc3_engine::{Domain, Game, MediaStorage, VnResult};

use crate::cache::ByteCache;
use crate::directory::{find_file, find_movie};
use crate::lnk::LnkArchive;
use crate::{AssetError, MediaKind};

/// Media read from the game's own `.dat` archives. Archives are opened on
/// first use; movies are loose files under `movie/`.
#[derive(Debug)]
pub struct LnkMediaStorage {
    root: PathBuf,
    game: Game,
    archives: BTreeMap<MediaKind, LnkArchive>,
    cache: ByteCache,
}

impl LnkMediaStorage {
    pub fn new(root: impl Into<PathBuf>, game: Game) -> Self {
        Self {
            root: root.into(),
            game,
            archives: BTreeMap::new(),
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

    /// The archive holding `kind`, opened and parsed on first use.
    pub fn archive(&mut self, kind: MediaKind) -> Result<&LnkArchive, AssetError> {
        if !self.archives.contains_key(&kind) {
            let file_name = format!("{}.dat", kind.archive(self.game));
            let path = find_file(&self.root, &file_name)?.ok_or_else(|| AssetError::Missing {
                kind: "archive",
                name: file_name.clone(),
            })?;
            let archive = LnkArchive::parse(Domain::new(fs::read(&path)?))?;
            tracing::info!(
                path = %path.display(),
                entries = archive.entries().len(),
                "opened media archive"
            );
            self.archives.insert(kind, archive);
        }
        self.archives.get(&kind).ok_or_else(|| AssetError::Missing {
            kind: "archive",
            name: kind.archive(self.game).to_string(),
        })
    }

    pub fn load(&mut self, kind: MediaKind, name: &str) -> Result<Domain, AssetError> {
        let key = format!("{}/{}", kind.archive(self.game), name.to_lowercase());
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }
        let missing = || AssetError::Missing {
            kind: kind.label(),
            name: name.to_string(),
        };

        let data = if kind == MediaKind::Movie {
            let dir = self.root.join(kind.archive(self.game));
            let path = find_movie(&dir, name)?.ok_or_else(missing)?;
            Domain::new(fs::read(path)?)
        } else {
            let file_name = kind.file_name(name);
            let archive = self.archive(kind)?;
            let entry = archive.find(&file_name).ok_or_else(missing)?;
            archive.plain(entry)?
        };
        self.cache.insert(key, data.clone());
        Ok(data)
    }
}

impl MediaStorage for LnkMediaStorage {
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
