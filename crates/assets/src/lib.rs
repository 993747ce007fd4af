//! Media storage for the interpreter: extracted directories and the games'
//! own LNK archives.

use std::path::{Path, PathBuf};

use sc3_engine::VnError;
use thiserror::Error;

mod cache;
pub mod directory;
pub mod layout;
pub mod lnk;
pub mod lnk_storage;
pub mod rle;

pub use directory::DirectoryStorage;
pub use layout::MediaKind;
pub use lnk::{LnkArchive, LnkEntry};
pub use lnk_storage::LnkMediaStorage;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("media path traversal blocked")]
    Traversal,
    #[error("missing {kind} media '{name}'")]
    Missing { kind: &'static str, name: String },
    #[error("invalid archive: {0}")]
    InvalidArchive(String),
    #[error("compressed data is corrupt: {0}")]
    Compression(String),
}

impl From<AssetError> for VnError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Missing { kind, name } => VnError::Media { kind, name },
            other => VnError::InvalidContainer(other.to_string()),
        }
    }
}

/// Strips `.` components and rejects anything that could leave the root.
pub fn sanitize_rel_path(rel: &Path) -> Result<PathBuf, AssetError> {
    use std::path::Component::*;
    let mut out = PathBuf::new();
    for component in rel.components() {
        match component {
            CurDir => {}
            Normal(part) => out.push(part),
            ParentDir | RootDir | Prefix(_) => return Err(AssetError::Traversal),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
