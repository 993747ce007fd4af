//! LNK archives: the `.dat` containers of Ever17 and Never7.
//!
//! Layout: `LNK\0`, entry count (`u32`), 8 unknown bytes, then one 32-byte
//! record per entry (`u32` offset, `u32` length times two plus a compression
//! bit, 24-byte NUL-padded name). Offsets are relative to the end of the
//! record table.

use sc3_engine::Domain;

use crate::{rle, AssetError};

pub const LNK_MAGIC: [u8; 4] = *b"LNK\0";
pub const LND_MAGIC: [u8; 4] = *b"lnd\0";

const HEADER_LEN: usize = 16;
const RECORD_LEN: usize = 32;
const NAME_LEN: usize = 24;
const LND_HEADER_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LnkEntry {
    pub name: String,
    /// Offset of the stored bytes within the archive.
    pub offset: usize,
    pub len: usize,
    pub compressed: bool,
}

#[derive(Clone, Debug)]
pub struct LnkArchive {
    data: Domain,
    entries: Vec<LnkEntry>,
}

impl LnkArchive {
    pub fn parse(data: Domain) -> Result<Self, AssetError> {
        let bytes = data.get_data();
        if bytes.get(..4) != Some(&LNK_MAGIC[..]) {
            return Err(AssetError::InvalidArchive("missing LNK magic".to_string()));
        }
        let count = read_u32(bytes, 4)? as usize;
        let base = count
            .checked_mul(RECORD_LEN)
            .and_then(|table| table.checked_add(HEADER_LEN))
            .ok_or_else(|| AssetError::InvalidArchive(format!("entry count {count} overflows")))?;

        let mut entries = Vec::with_capacity(count.min(bytes.len() / RECORD_LEN));
        let mut total = 0usize;
        for i in 0..count {
            let at = HEADER_LEN + i * RECORD_LEN;
            let offset = read_u32(bytes, at)? as usize;
            let raw_len = read_u32(bytes, at + 4)? as usize;
            let name = bytes
                .get(at + 8..at + RECORD_LEN)
                .ok_or_else(|| truncated(at + 8))?;
            let end = name.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
            let len = raw_len / 2;
            total += len;
            entries.push(LnkEntry {
                name: String::from_utf8_lossy(&name[..end]).into_owned(),
                offset: base + offset,
                len,
                compressed: raw_len % 2 == 1,
            });
        }
        if base + total != bytes.len() {
            return Err(AssetError::InvalidArchive(format!(
                "content length {} does not match file length {}",
                base + total,
                bytes.len()
            )));
        }
        if let Some(entry) = entries.iter().find(|entry| entry.offset + entry.len > bytes.len()) {
            return Err(AssetError::InvalidArchive(format!(
                "entry '{}' ends past the archive",
                entry.name
            )));
        }
        tracing::debug!(entries = entries.len(), bytes = bytes.len(), "parsed LNK archive");
        Ok(Self { data, entries })
    }

    /// Packs `(name, stored bytes, compressed)` triples into an archive.
    pub fn build<'a>(
        files: impl IntoIterator<Item = (&'a str, &'a [u8], bool)>,
    ) -> Result<Self, AssetError> {
        let files: Vec<_> = files.into_iter().collect();
        let mut out = LNK_MAGIC.to_vec();
        out.extend(u32_of(files.len())?.to_le_bytes());
        out.extend([0u8; 8]);
        let mut offset = 0usize;
        for (name, data, compressed) in &files {
            if name.len() > NAME_LEN {
                return Err(AssetError::InvalidArchive(format!(
                    "name '{name}' is longer than {NAME_LEN} bytes"
                )));
            }
            out.extend(u32_of(offset)?.to_le_bytes());
            out.extend(u32_of(data.len() * 2 + usize::from(*compressed))?.to_le_bytes());
            let mut padded = [0u8; NAME_LEN];
            padded[..name.len()].copy_from_slice(name.as_bytes());
            out.extend(padded);
            offset += data.len();
        }
        for (_, data, _) in &files {
            out.extend_from_slice(data);
        }
        Self::parse(Domain::new(out))
    }

    /// Serializes the archive. Parsed archives write back byte for byte,
    /// except for the unknown header bytes which are written as zero.
    pub fn write(&self) -> Result<Vec<u8>, AssetError> {
        let files = self
            .entries
            .iter()
            .map(|entry| Ok((entry.name.as_str(), self.stored(entry)?, entry.compressed)))
            .collect::<Result<Vec<_>, AssetError>>()?;
        Ok(Self::build(files)?.data.get_data().to_vec())
    }

    pub fn entries(&self) -> &[LnkEntry] {
        &self.entries
    }

    /// Entry whose name matches case-insensitively.
    pub fn find(&self, name: &str) -> Option<&LnkEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Bytes as stored in the archive.
    pub fn stored(&self, entry: &LnkEntry) -> Result<&[u8], AssetError> {
        self.data
            .get_data()
            .get(entry.offset..entry.offset + entry.len)
            .ok_or_else(|| truncated(entry.offset))
    }

    /// Entry contents with `lnd` compression undone.
    pub fn plain(&self, entry: &LnkEntry) -> Result<Domain, AssetError> {
        if !entry.compressed {
            return self
                .data
                .sub(entry.offset, entry.len)
                .map_err(|err| AssetError::InvalidArchive(err.to_string()));
        }
        let stored = self.stored(entry)?;
        if stored.get(..4) != Some(&LND_MAGIC[..]) {
            return Err(AssetError::Compression(format!(
                "'{}' lacks the lnd preamble",
                entry.name
            )));
        }
        let plain_len = read_u32(stored, 8)? as usize;
        let body = stored.get(LND_HEADER_LEN..).ok_or_else(|| truncated(LND_HEADER_LEN))?;
        Ok(Domain::new(rle::unpack(body, plain_len)?))
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, AssetError> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| truncated(at))
}

fn u32_of(value: usize) -> Result<u32, AssetError> {
    u32::try_from(value)
        .map_err(|_| AssetError::InvalidArchive(format!("{value} does not fit the LNK format")))
}

fn truncated(at: usize) -> AssetError {
    AssetError::InvalidArchive(format!("truncated at {at:#x}"))
}

#[cfg(test)]
#[path = "tests/lnk_tests.rs"]
mod tests;
