use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::token::Token;

pub type VnResult<T> = Result<T, VnError>;

#[derive(Debug, Error, Diagnostic)]
pub enum VnError {
    #[error("read of {requested} bytes at {offset:#x} crosses domain limit {limit:#x}")]
    #[diagnostic(code("sc3.domain_bounds"))]
    DomainBounds {
        offset: usize,
        requested: usize,
        limit: usize,
    },
    #[error("unknown opcode {opcode} at {offset:#x}")]
    #[diagnostic(code("sc3.unknown_opcode"))]
    UnknownOpcode { opcode: String, offset: usize },
    #[error("invalid data at {offset:#x}: {message}")]
    #[diagnostic(code("sc3.invalid_data"))]
    InvalidData { offset: usize, message: String },
    #[error("undecodable text at {offset:#x}: {message}")]
    #[diagnostic(code("sc3.text_decode"))]
    TextDecode { offset: usize, message: String },
    #[error("malformed active value: {0}")]
    #[diagnostic(code("sc3.active_value"))]
    ActiveValueStructure(String),
    #[error("evaluation failed: {0}")]
    #[diagnostic(code("sc3.evaluation"))]
    Evaluation(String),
    #[error("{kind} reference {index} out of range (table holds {count})")]
    #[diagnostic(code("sc3.invalid_reference"))]
    InvalidReference {
        kind: &'static str,
        index: u16,
        count: usize,
    },
    #[error("invalid SC3 container: {0}")]
    #[diagnostic(code("sc3.invalid_container"))]
    InvalidContainer(String),
    #[error("runtime state violation: {0}")]
    #[diagnostic(code("sc3.runtime_state"))]
    RuntimeState(String),
    #[error("playback failed: {0}")]
    #[diagnostic(code("sc3.playback"))]
    Playback(String),
    #[error("missing {kind} media '{name}'")]
    #[diagnostic(code("sc3.media"))]
    Media { kind: &'static str, name: String },
    #[error("at {position}: {source}")]
    #[diagnostic(code("sc3.at_token"))]
    AtToken {
        position: String,
        #[source]
        source: Box<VnError>,
    },
    #[error("serialization error: {message}")]
    #[diagnostic(code("sc3.serialization"))]
    Serialization {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
}

impl VnError {
    /// Strips position wrappers and returns the underlying error.
    pub fn root(&self) -> &VnError {
        match self {
            VnError::AtToken { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A chunk that stopped tokenizing part way, with everything read up to the failure.
#[derive(Debug, Error)]
#[error("tokenizing stopped after {} tokens: {error}", tokens.len())]
pub struct TokenizeFailure {
    pub tokens: Vec<Token>,
    #[source]
    pub error: VnError,
}

#[cold]
#[inline(never)]
pub(crate) fn invalid_data(offset: usize, message: impl Into<String>) -> VnError {
    VnError::InvalidData {
        offset,
        message: message.into(),
    }
}

#[cold]
#[inline(never)]
pub(crate) fn structure_error(message: impl Into<String>) -> VnError {
    VnError::ActiveValueStructure(message.into())
}

#[cold]
#[inline(never)]
pub(crate) fn evaluation_error(message: impl Into<String>) -> VnError {
    VnError::Evaluation(message.into())
}

#[cold]
#[inline(never)]
pub(crate) fn state_error(message: impl Into<String>) -> VnError {
    VnError::RuntimeState(message.into())
}

#[cold]
#[inline(never)]
pub(crate) fn playback_error(message: impl Into<String>) -> VnError {
    VnError::Playback(message.into())
}

#[cold]
#[inline(never)]
pub(crate) fn container_error(message: impl Into<String>) -> VnError {
    VnError::InvalidContainer(message.into())
}

#[cold]
#[inline(never)]
pub(crate) fn toml_deserialize_error(input: &str, err: &toml::de::Error) -> VnError {
    let span = err
        .span()
        .map(|range| (range.start, range.end.saturating_sub(range.start)))
        .unwrap_or((0, 0));
    VnError::Serialization {
        message: err.message().to_string(),
        src: input.to_string(),
        span: span.into(),
    }
}

#[cold]
#[inline(never)]
pub(crate) fn plain_serialization_error(error: impl std::fmt::Display) -> VnError {
    VnError::Serialization {
        message: error.to_string(),
        src: String::new(),
        span: (0, 0).into(),
    }
}
