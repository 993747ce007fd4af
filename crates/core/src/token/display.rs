use std::fmt::Write as _;

use crate::graph::Edge;
use crate::script::ScriptFile;

use super::{ChoiceEntry, EventAction, Operand, Token, TokenKind, VoiceSource};

impl Token {
    /// Human-readable form with references resolved through `script`.
    pub fn format_hr(&self, script: &ScriptFile) -> String {
        match self.kind() {
            TokenKind::Event(op) => format_op(op.path(), op.def().name, op.operands(), script),
            TokenKind::Conv(op) => format_op(op.path(), op.def().name, op.operands(), script),
            TokenKind::Text(text) => format!("text {text:?}"),
            TokenKind::Textblock(block) => {
                let mut out = format!("textblock {:?}", block.lines);
                match &block.voice {
                    VoiceSource::None => {}
                    VoiceSource::Clip(name) => {
                        let _ = write!(out, " voice '{}'", name.escape_ascii());
                    }
                    VoiceSource::Pushed => out.push_str(" voice <pushed>"),
                }
                out
            }
            TokenKind::NonTokenData(data) => format!("data ({} bytes)", data.len()),
        }
    }

    /// Callgraph edges leaving this token. Destinations without a script
    /// name point into the current file.
    pub fn edges(&self, script: &ScriptFile) -> Vec<Edge> {
        let TokenKind::Event(op) = self.kind() else {
            return Vec::new();
        };
        let mut edges: Vec<Edge> = op
            .operands()
            .iter()
            .filter_map(|operand| match operand {
                Operand::Esr(esr) if !esr.data => Some(Edge::local(usize::from(esr.index))),
                _ => None,
            })
            .collect();
        match op.def().action {
            EventAction::ScriptLink => {
                let target = data_chunk(op.operands(), script);
                let end = target.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
                let name = &target[..end];
                if !name.is_empty() && name != b"debug" {
                    edges.push(Edge::to_script(script_file_name(name)));
                }
            }
            EventAction::JumpTable => {
                let table = data_chunk(op.operands(), script);
                edges.extend(
                    table
                        .chunks_exact(2)
                        .map(|pair| Edge::local(usize::from(u16::from_le_bytes([pair[0], pair[1]])))),
                );
            }
            EventAction::FileJump | EventAction::ReturnableFileJump => {
                if let Some(Operand::CStr(name)) = op
                    .operands()
                    .iter()
                    .find(|operand| matches!(operand, Operand::CStr(_)))
                {
                    edges.push(Edge::to_script(script_file_name(name)));
                }
            }
            _ => {}
        }
        edges
    }
}

/// File name a script jump resolves to.
pub(crate) fn script_file_name(name: &[u8]) -> String {
    format!("{}.scr", String::from_utf8_lossy(name).to_lowercase())
}

fn data_chunk<'a>(operands: &[Operand], script: &'a ScriptFile) -> &'a [u8] {
    operands
        .iter()
        .find_map(|operand| match operand {
            Operand::Esr(esr) if esr.data => script
                .event_chunk(usize::from(esr.index))
                .ok()
                .map(|chunk| chunk.get_data()),
            _ => None,
        })
        .unwrap_or_default()
}

fn format_op(
    path: crate::registry::OpPath,
    name: &str,
    operands: &[Operand],
    script: &ScriptFile,
) -> String {
    let mut out = format!("{path} {name}");
    for (i, operand) in operands.iter().enumerate() {
        out.push_str(if i == 0 { ": " } else { ", " });
        format_operand(&mut out, operand, script);
    }
    out
}

fn format_operand(out: &mut String, operand: &Operand, script: &ScriptFile) {
    let _ = match operand {
        Operand::Av(value) => write!(out, "{value}"),
        Operand::U8(value) => write!(out, "{value}"),
        Operand::U16(value) => write!(out, "{value}"),
        Operand::S16(value) => write!(out, "{value}"),
        Operand::Bytes(bytes) => write!(out, "{bytes:02x?}"),
        Operand::Esr(esr) if esr.data => {
            let data = script
                .event_chunk(usize::from(esr.index))
                .map(|chunk| chunk.get_data())
                .unwrap_or_default();
            write!(out, "es{}('{}')", esr.index, data.escape_ascii())
        }
        Operand::Esr(esr) => write!(out, "es{}", esr.index),
        Operand::Fnr(fnr) => {
            let name = script.filename(usize::from(fnr.index)).unwrap_or_default();
            let written = write!(out, "fn{}('{}')", fnr.index, name.escape_ascii());
            match &fnr.aux {
                Some(aux) => write!(out, " aux [{}, {}, {}, {}]", aux[0], aux[1], aux[2], aux[3]),
                None => written,
            }
        }
        Operand::Convr(convr) => match script.conv_text_lines(usize::from(convr.index)) {
            Ok(lines) => write!(out, "cs{}({lines:?})", convr.index),
            Err(_) => write!(out, "cs{}(?)", convr.index),
        },
        Operand::CStr(bytes) | Operand::Ascii(bytes) => write!(out, "'{}'", bytes.escape_ascii()),
        Operand::Text(text) => write!(out, "{text:?}"),
        Operand::Choice(ChoiceEntry::Question { id }) => write!(out, "question {id}"),
        Operand::Choice(ChoiceEntry::Option {
            display: Some(display),
            text,
        }) => write!(out, "{text:?} if {display}"),
        Operand::Choice(ChoiceEntry::Option {
            display: None,
            text,
        }) => write!(out, "{text:?}"),
    };
}
