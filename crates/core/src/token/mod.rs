//! Typed tokens decoded from event and conversation chunks.

mod action;
mod display;

use std::fmt;

pub use action::{ConvAction, EventAction};

use crate::av::ActiveValue;
use crate::domain::Domain;
use crate::error::{state_error, VnResult};
use crate::registry::{OpDef, OpPath};

/// One read performed while decoding an opcode's operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Av,
    AvN(usize),
    /// An active value that must evaluate to the constant 0.
    AvZero,
    U8,
    U16,
    S16,
    Bytes(usize),
    Nulls(usize),
    Const(&'static [u8]),
    Esr,
    /// Event-script reference whose target holds data, not code.
    EsrData,
    Fnr,
    Convr,
    CStr(u8),
    Text(u8),
    /// Decoded text whose terminator is left unread.
    TextOpen,
    Ascii(u8),
    ChoiceEntry,
    End,
}

/// Event-script chunk reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EsRef {
    pub index: u16,
    pub data: bool,
}

/// Conversation-script chunk reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvRef {
    pub index: u16,
}

/// Filename table reference with its optional auxiliary values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnRef {
    pub index: u16,
    pub aux: Option<Box<[ActiveValue; 4]>>,
}

/// Body of an Ever17 conversation `0b` token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChoiceEntry {
    /// Opens a choice with the given id.
    Question { id: u16 },
    /// One candidate; `display` decides whether it is offered.
    Option {
        display: Option<ActiveValue>,
        text: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Av(ActiveValue),
    U8(u8),
    U16(u16),
    S16(i16),
    Bytes(Vec<u8>),
    Esr(EsRef),
    Fnr(FnRef),
    Convr(ConvRef),
    CStr(Vec<u8>),
    Text(String),
    Ascii(Vec<u8>),
    Choice(ChoiceEntry),
}

/// A decoded opcode with its operands.
#[derive(Clone, Debug)]
pub struct OpToken<A: 'static> {
    path: OpPath,
    def: &'static OpDef<A>,
    operands: Vec<Operand>,
}

impl<A> OpToken<A> {
    pub fn new(path: OpPath, def: &'static OpDef<A>, operands: Vec<Operand>) -> Self {
        Self {
            path,
            def,
            operands,
        }
    }

    pub fn path(&self) -> OpPath {
        self.path
    }

    pub fn def(&self) -> &'static OpDef<A> {
        self.def
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> VnResult<&Operand> {
        self.operands.get(index).ok_or_else(|| {
            state_error(format!(
                "{} {} has no operand {index}",
                self.path, self.def.name
            ))
        })
    }

    pub fn av(&self, index: usize) -> VnResult<&ActiveValue> {
        match self.operand(index)? {
            Operand::Av(value) => Ok(value),
            other => Err(self.mismatch(index, "an active value", other)),
        }
    }

    pub fn u8(&self, index: usize) -> VnResult<u8> {
        match self.operand(index)? {
            Operand::U8(value) => Ok(*value),
            other => Err(self.mismatch(index, "a byte", other)),
        }
    }

    pub fn esr(&self, index: usize) -> VnResult<EsRef> {
        match self.operand(index)? {
            Operand::Esr(reference) => Ok(*reference),
            other => Err(self.mismatch(index, "an event-script reference", other)),
        }
    }

    pub fn convr(&self, index: usize) -> VnResult<ConvRef> {
        match self.operand(index)? {
            Operand::Convr(reference) => Ok(*reference),
            other => Err(self.mismatch(index, "a conversation reference", other)),
        }
    }

    pub fn fnr(&self, index: usize) -> VnResult<&FnRef> {
        match self.operand(index)? {
            Operand::Fnr(reference) => Ok(reference),
            other => Err(self.mismatch(index, "a filename reference", other)),
        }
    }

    /// Raw byte-string operands: terminated strings, ASCII names, fixed runs.
    pub fn bytes(&self, index: usize) -> VnResult<&[u8]> {
        match self.operand(index)? {
            Operand::CStr(bytes) | Operand::Ascii(bytes) | Operand::Bytes(bytes) => Ok(bytes),
            other => Err(self.mismatch(index, "a byte string", other)),
        }
    }

    pub fn text(&self, index: usize) -> VnResult<&str> {
        match self.operand(index)? {
            Operand::Text(text) => Ok(text),
            other => Err(self.mismatch(index, "text", other)),
        }
    }

    pub fn choice(&self, index: usize) -> VnResult<&ChoiceEntry> {
        match self.operand(index)? {
            Operand::Choice(entry) => Ok(entry),
            other => Err(self.mismatch(index, "a choice entry", other)),
        }
    }

    fn mismatch(&self, index: usize, wanted: &str, found: &Operand) -> crate::error::VnError {
        state_error(format!(
            "operand {index} of {} {} is not {wanted}: {found:?}",
            self.path, self.def.name
        ))
    }
}

/// Where a textblock's voice clip comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum VoiceSource {
    #[default]
    None,
    /// Named inline by a voice token inside the block.
    Clip(Vec<u8>),
    /// Taken from the clip pushed by the event script when the block runs.
    Pushed,
}

/// Lines of text shown together, with their voice clip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Textblock {
    pub lines: Vec<String>,
    pub voice: VoiceSource,
}

#[derive(Clone, Debug)]
pub enum TokenKind {
    Event(OpToken<EventAction>),
    Conv(OpToken<ConvAction>),
    /// A run of text bytes inside a conversation chunk.
    Text(String),
    Textblock(Textblock),
    /// A chunk holding data referenced from elsewhere, left undecoded.
    NonTokenData(Domain),
}

/// Grouping key for token statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenType {
    NonTokenData,
    Op(OpPath),
    Text,
    Textblock,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::NonTokenData => f.write_str("data"),
            TokenType::Op(path) => write!(f, "{path}"),
            TokenType::Text => f.write_str("text"),
            TokenType::Textblock => f.write_str("textblock"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    offset: usize,
    raw: Option<Domain>,
    kind: TokenKind,
}

impl Token {
    pub fn new(offset: usize, raw: Option<Domain>, kind: TokenKind) -> Self {
        Self { offset, raw, kind }
    }

    /// Absolute offset of the first byte of the token.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The bytes the token was decoded from, when captured.
    pub fn raw(&self) -> Option<&Domain> {
        self.raw.as_ref()
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub fn token_type(&self) -> TokenType {
        match &self.kind {
            TokenKind::Event(op) => TokenType::Op(op.path()),
            TokenKind::Conv(op) => TokenType::Op(op.path()),
            TokenKind::Text(_) => TokenType::Text,
            TokenKind::Textblock(_) => TokenType::Textblock,
            TokenKind::NonTokenData(_) => TokenType::NonTokenData,
        }
    }

    pub fn conv_action(&self) -> Option<ConvAction> {
        match &self.kind {
            TokenKind::Conv(op) => Some(op.def().action),
            _ => None,
        }
    }

    /// Whether dump output ends the row after this token.
    pub fn linebreak(&self) -> bool {
        match &self.kind {
            TokenKind::Event(op) => op.def().linebreak,
            TokenKind::Conv(op) => op.def().linebreak,
            TokenKind::Text(_) => false,
            TokenKind::Textblock(_) | TokenKind::NonTokenData(_) => true,
        }
    }

    /// Lines of visible text carried by the token.
    pub fn text_lines(&self) -> Vec<String> {
        match &self.kind {
            TokenKind::Text(text) => vec![text.clone()],
            TokenKind::Textblock(block) => block.lines.clone(),
            TokenKind::Conv(op) => op
                .operands()
                .iter()
                .filter_map(|operand| match operand {
                    Operand::Text(text) => Some(text.clone()),
                    Operand::Choice(ChoiceEntry::Option { text, .. }) => Some(text.clone()),
                    _ => None,
                })
                .collect(),
            TokenKind::Event(_) | TokenKind::NonTokenData(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "tests/token_tests.rs"]
mod tests;
