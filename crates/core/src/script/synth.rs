//! Grouping of conversation text into textblocks.
//!
//! Conversation bytecode has no explicit block structure; runs of text,
//! linefeeds, and voice tokens are folded into one textblock each.

use crate::error::{invalid_data, VnResult};
use crate::token::{ConvAction, Textblock, Token, TokenKind, VoiceSource};

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockStart {
    /// Opens a block and is dropped from it.
    Opener,
    /// Opens a block and is its first member.
    Member,
}

fn ever17_start(token: &Token) -> Option<BlockStart> {
    match token.kind() {
        TokenKind::Text(_) => Some(BlockStart::Member),
        TokenKind::Conv(op) => match op.def().action {
            ConvAction::Linefeed | ConvAction::BlockPrefix | ConvAction::Section => {
                Some(BlockStart::Opener)
            }
            ConvAction::Voice => Some(BlockStart::Member),
            _ => None,
        },
        _ => None,
    }
}

pub(super) fn ever17_textblocks(tokens: &[Token]) -> VnResult<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let first = i;
        i += 1;
        let Some(start) = ever17_start(&tokens[first]) else {
            out.push(tokens[first].clone());
            continue;
        };
        if start == BlockStart::Member {
            i -= 1;
        }
        let mut lines = vec![String::new()];
        let mut voice = None;
        while let Some(token) = tokens.get(i) {
            match token.kind() {
                TokenKind::Text(text) => push_text(&mut lines, text),
                TokenKind::Conv(op) => match op.def().action {
                    ConvAction::Linefeed => lines.push(String::new()),
                    ConvAction::BlockPrefix | ConvAction::TextAux => {}
                    ConvAction::Voice => {
                        if voice.is_some() {
                            return Err(invalid_data(
                                token.offset(),
                                "second voice clip in one textblock",
                            ));
                        }
                        voice = Some(op.bytes(0)?.to_vec());
                    }
                    _ => break,
                },
                _ => break,
            }
            i += 1;
        }
        if lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        if lines.is_empty() && voice.is_none() {
            out.extend_from_slice(&tokens[first..i]);
            continue;
        }
        let voice = voice.map_or(VoiceSource::None, VoiceSource::Clip);
        out.push(block_token(&tokens[first..i], Textblock { lines, voice }));
    }
    Ok(out)
}

pub(super) fn never7_textblocks(tokens: &[Token]) -> VnResult<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let first = i;
        let TokenKind::Text(text) = tokens[first].kind() else {
            out.push(tokens[first].clone());
            i += 1;
            continue;
        };
        let mut lines = vec![text.clone()];
        i += 1;
        while let Some(token) = tokens.get(i) {
            match token.kind() {
                TokenKind::Text(text) => push_text(&mut lines, text),
                TokenKind::Conv(op) if op.def().action == ConvAction::Linefeed => {
                    lines.push(String::new())
                }
                TokenKind::Conv(op) if op.def().action == ConvAction::TextAux => {}
                _ => break,
            }
            i += 1;
        }
        if lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        out.push(block_token(
            &tokens[first..i],
            Textblock {
                lines,
                voice: VoiceSource::Pushed,
            },
        ));
    }
    Ok(out)
}

fn push_text(lines: &mut Vec<String>, text: &str) {
    match lines.last_mut() {
        Some(line) => line.push_str(text),
        None => lines.push(text.to_string()),
    }
}

fn block_token(members: &[Token], block: Textblock) -> Token {
    let offset = members.first().map_or(0, Token::offset);
    let raw = match (
        members.first().and_then(Token::raw),
        members.last().and_then(Token::raw),
    ) {
        (Some(first), Some(last)) => first.span_to(last),
        _ => None,
    };
    Token::new(offset, raw, TokenKind::Textblock(block))
}
