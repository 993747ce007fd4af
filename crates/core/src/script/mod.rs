//! SC3 script containers.
//!
//! An SC3 file holds three tables of chunks: event scripts, conversation
//! scripts, and filenames. Chunks are tokenized on demand.

mod reader;
mod synth;

use std::cell::RefCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cursor::Cursor;
use crate::domain::Domain;
use crate::error::{container_error, TokenizeFailure, VnError, VnResult};
use crate::games::Game;
use crate::text::is_text_byte;
use crate::token::{OpToken, Token, TokenKind};

pub use reader::ChunkReader;

pub const SC3_MAGIC: [u8; 4] = *b"SC3\0";

const UINT_LEN: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Drop the last offset-table entry when the table length is misaligned.
    pub alignment_heuristic: bool,
    /// Keep the raw bytes of each token.
    pub capture_raw: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            alignment_heuristic: true,
            capture_raw: false,
        }
    }
}

/// A parsed SC3 container.
#[derive(Debug)]
pub struct ScriptFile {
    name: String,
    game: Game,
    domain: Domain,
    options: ParseOptions,
    off_cs_list: usize,
    events: Vec<Domain>,
    convs: Vec<Domain>,
    filenames: Vec<Domain>,
    blacklist: RefCell<BTreeSet<u16>>,
}

impl ScriptFile {
    pub fn parse(
        domain: Domain,
        name: impl Into<String>,
        game: Game,
        options: ParseOptions,
    ) -> VnResult<Self> {
        let name = name.into();
        let base = domain.offset();
        let total = domain.len();
        let mut cursor = Cursor::new(domain.clone());
        cursor.eat_const(&SC3_MAGIC).map_err(|_| {
            container_error(format!("{name}: missing SC3 magic"))
        })?;
        let off_cs_list = cursor.read_u32()? as usize;
        let off_fn_list = cursor.read_u32()? as usize;
        if off_cs_list > total || off_fn_list > total {
            return Err(container_error(format!(
                "{name}: table offsets {off_cs_list:#x}/{off_fn_list:#x} exceed size {total:#x}"
            )));
        }

        let es_offs = read_uint_list(&mut cursor, base, None, options.alignment_heuristic)?;
        let events = package(&domain, &es_offs, off_cs_list)?;

        let (convs, filenames) = if off_cs_list != total {
            seek_to(&mut cursor, &domain, off_cs_list)?;
            let cs_offs =
                read_uint_list(&mut cursor, base, Some(off_fn_list), options.alignment_heuristic)?;
            let (filenames, cs_end) = if off_fn_list != total {
                seek_to(&mut cursor, &domain, off_fn_list)?;
                let fn_offs = read_uint_list(
                    &mut cursor,
                    base,
                    cs_offs.first().copied(),
                    options.alignment_heuristic,
                )?;
                let cs_end = fn_offs.first().copied().unwrap_or(total);
                (package(&domain, &fn_offs, total)?, cs_end)
            } else {
                (Vec::new(), total)
            };
            (package(&domain, &cs_offs, cs_end)?, filenames)
        } else {
            (Vec::new(), Vec::new())
        };

        tracing::info!(
            script = %name,
            events = events.len(),
            conversations = convs.len(),
            filenames = filenames.len(),
            "parsed script file"
        );
        Ok(Self {
            name,
            game,
            domain,
            options,
            off_cs_list,
            events,
            convs,
            filenames,
            blacklist: RefCell::new(BTreeSet::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn conv_count(&self) -> usize {
        self.convs.len()
    }

    pub fn filename_count(&self) -> usize {
        self.filenames.len()
    }

    pub fn event_chunk(&self, index: usize) -> VnResult<&Domain> {
        lookup("event script", &self.events, index)
    }

    pub fn conv_chunk(&self, index: usize) -> VnResult<&Domain> {
        lookup("conversation", &self.convs, index)
    }

    /// Filename bytes with trailing NULs removed.
    pub fn filename(&self, index: usize) -> VnResult<&[u8]> {
        let data = lookup("filename", &self.filenames, index)?.get_data();
        let end = data.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);
        Ok(&data[..end])
    }

    pub fn is_blacklisted(&self, index: usize) -> bool {
        u16::try_from(index).is_ok_and(|index| self.blacklist.borrow().contains(&index))
    }

    pub(crate) fn blacklist(&self, index: u16) {
        self.blacklist.borrow_mut().insert(index);
    }

    /// Human-readable chunk position, used in error reports.
    pub fn segment_name(&self, index: usize) -> String {
        format!("{}:es{index}", self.name)
    }

    /// Tokenizes one event-script chunk.
    pub fn tokenize_event(
        &self,
        index: usize,
        capture_raw: bool,
    ) -> Result<Vec<Token>, TokenizeFailure> {
        let chunk = self.event_chunk(index).map_err(TokenizeFailure::empty)?.clone();
        if self.is_blacklisted(index) {
            let raw = capture_raw.then(|| chunk.clone());
            return Ok(vec![Token::new(
                chunk.offset(),
                raw,
                TokenKind::NonTokenData(chunk),
            )]);
        }
        let table = self.game.event_table();
        let mut reader = ChunkReader::new(self, chunk);
        let mut tokens = Vec::new();
        while !reader.at_end() {
            let start = reader.pos();
            let token = reader.read_op(table).and_then(|(path, def, operands)| {
                let raw = capture(&mut reader, start, capture_raw)?;
                Ok(Token::new(
                    start,
                    raw,
                    TokenKind::Event(OpToken::new(path, def, operands)),
                ))
            });
            match token {
                Ok(token) => tokens.push(token),
                Err(error) => return Err(TokenizeFailure { tokens, error }),
            }
        }
        Ok(tokens)
    }

    /// Tokenizes one conversation chunk and groups its text into textblocks.
    pub fn tokenize_conv(
        &self,
        index: usize,
        capture_raw: bool,
    ) -> Result<Vec<Token>, TokenizeFailure> {
        let tokens = self.tokenize_conv_plain(index, capture_raw)?;
        let synthesized = match self.game {
            Game::Ever17 => synth::ever17_textblocks(&tokens),
            Game::Never7 => synth::never7_textblocks(&tokens),
        };
        synthesized.map_err(|error| TokenizeFailure { tokens, error })
    }

    /// Tokenizes one conversation chunk without grouping text.
    pub fn tokenize_conv_plain(
        &self,
        index: usize,
        capture_raw: bool,
    ) -> Result<Vec<Token>, TokenizeFailure> {
        let chunk = self.conv_chunk(index).map_err(TokenizeFailure::empty)?.clone();
        let table = self.game.conv_table();
        let codec = self.game.codec();
        let mut reader = ChunkReader::new(self, chunk);
        let mut tokens = Vec::new();
        while !reader.at_end() {
            let start = reader.pos();
            let token = match reader.read_op(table) {
                Ok((path, def, operands)) => capture(&mut reader, start, capture_raw).map(|raw| {
                    Token::new(start, raw, TokenKind::Conv(OpToken::new(path, def, operands)))
                }),
                Err(VnError::UnknownOpcode { opcode, offset }) => {
                    read_text_run(&mut reader, start, capture_raw, codec)
                        .unwrap_or_else(|| Err(VnError::UnknownOpcode { opcode, offset }))
                }
                Err(error) => Err(error),
            };
            match token {
                Ok(token) => tokens.push(token),
                Err(error) => return Err(TokenizeFailure { tokens, error }),
            }
        }
        Ok(tokens)
    }

    /// Every line of text in a conversation chunk.
    pub fn conv_text_lines(&self, index: usize) -> VnResult<Vec<String>> {
        let tokens = self
            .tokenize_conv(index, false)
            .map_err(|failure| failure.error)?;
        Ok(tokens.iter().flat_map(Token::text_lines).collect())
    }

    /// Serializes the file. Unmodified input round-trips byte for byte.
    pub fn write(&self) -> VnResult<Vec<u8>> {
        let head = self.domain.sub(0, self.off_cs_list)?;
        let entries = self.convs.len() + self.filenames.len();
        let mut out = Vec::with_capacity(self.domain.len());
        out.extend_from_slice(head.get_data());
        let table_start = out.len();
        out.resize(table_start + entries * UINT_LEN, 0);
        let mut offsets = Vec::with_capacity(entries);
        for chunk in self.convs.iter().chain(&self.filenames) {
            offsets.push(to_u32(out.len())?);
            out.extend_from_slice(chunk.get_data());
        }
        for (slot, offset) in offsets.into_iter().enumerate() {
            let at = table_start + slot * UINT_LEN;
            out[at..at + UINT_LEN].copy_from_slice(&offset.to_le_bytes());
        }
        Ok(out)
    }

    /// SHA-256 of the container bytes.
    pub fn script_id(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.domain.get_data());
        hasher.finalize().into()
    }
}

impl TokenizeFailure {
    fn empty(error: VnError) -> Self {
        Self {
            tokens: Vec::new(),
            error,
        }
    }
}

/// Falls back to a text run when the unknown opcode byte is a text byte.
fn read_text_run(
    reader: &mut ChunkReader<'_>,
    start: usize,
    capture_raw: bool,
    codec: crate::text::TextCodec,
) -> Option<VnResult<Token>> {
    let consumed = reader.pos() - start;
    if let Err(error) = reader.cursor().seek_back(consumed) {
        return Some(Err(error));
    }
    match reader.cursor().peek_u8() {
        Ok(byte) if is_text_byte(byte) => Some(text_token(reader, start, capture_raw, codec)),
        _ => None,
    }
}

fn text_token(
    reader: &mut ChunkReader<'_>,
    start: usize,
    capture_raw: bool,
    codec: crate::text::TextCodec,
) -> VnResult<Token> {
    let (text, _) = codec.read_string(reader.cursor())?;
    reader.cursor().seek_back(1)?;
    let raw = capture(reader, start, capture_raw)?;
    Ok(Token::new(start, raw, TokenKind::Text(text)))
}

fn capture(reader: &mut ChunkReader<'_>, start: usize, enabled: bool) -> VnResult<Option<Domain>> {
    if !enabled {
        return Ok(None);
    }
    reader.cursor().span_from(start).map(Some)
}

fn lookup<'a>(kind: &'static str, chunks: &'a [Domain], index: usize) -> VnResult<&'a Domain> {
    chunks.get(index).ok_or(VnError::InvalidReference {
        kind,
        index: u16::try_from(index).unwrap_or(u16::MAX),
        count: chunks.len(),
    })
}

fn seek_to(cursor: &mut Cursor, domain: &Domain, rel: usize) -> VnResult<()> {
    *cursor = Cursor::new(domain.clone());
    cursor.read(rel)?;
    Ok(())
}

/// Reads an offset table ending at `limit`, or at the first entry's value
/// when no limit is known.
fn read_uint_list(
    cursor: &mut Cursor,
    base: usize,
    limit: Option<usize>,
    heuristic: bool,
) -> VnResult<Vec<usize>> {
    let explicit = limit.is_some();
    let end = match limit {
        Some(limit) => limit,
        None => cursor.peek_u32()? as usize,
    } + base;
    let span = end.checked_sub(cursor.pos()).ok_or_else(|| {
        container_error(format!(
            "offset table at {:#x} ends before it starts ({end:#x})",
            cursor.pos()
        ))
    })?;
    let mut count = span / UINT_LEN;
    if !explicit && heuristic && span % UINT_LEN != 0 {
        count = count.saturating_sub(1);
    }
    (0..count)
        .map(|_| cursor.read_u32().map(|value| value as usize))
        .collect()
}

/// Splits the domain into chunks starting at each offset; the last chunk ends
/// at `end`.
fn package(domain: &Domain, offsets: &[usize], end: usize) -> VnResult<Vec<Domain>> {
    let mut chunks = Vec::with_capacity(offsets.len());
    for (i, start) in offsets.iter().copied().enumerate() {
        let next = offsets.get(i + 1).copied().unwrap_or(end);
        if next < start || next > domain.len() {
            return Err(container_error(format!(
                "chunk {i} spans {start:#x}..{next:#x} outside {:#x} bytes",
                domain.len()
            )));
        }
        chunks.push(domain.sub(start, next - start)?);
    }
    Ok(chunks)
}

fn to_u32(value: usize) -> VnResult<u32> {
    u32::try_from(value).map_err(|_| container_error(format!("offset {value:#x} exceeds u32")))
}

#[cfg(test)]
#[path = "tests/script_tests.rs"]
mod tests;
